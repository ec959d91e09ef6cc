//! Cosmetic cleanup of streamed markdown.
//!
//! Generated text sometimes arrives wrapped in literal quote characters or
//! with runs of blank lines. The normalizer strips leading and trailing
//! quotes and collapses blank-line runs to a single blank line, working
//! chunk by chunk so output can still be printed as it arrives.

const MAX_NEWLINES: usize = 2;

#[derive(Debug, Default)]
pub struct MarkdownNormalizer {
    started: bool,
    /// Newlines, quotes and indentation held back until we know whether
    /// they are trailing
    pending: String,
}

impl MarkdownNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and get back the text that is safe to print now
    pub fn push(&mut self, chunk: &str) -> String {
        let mut out = String::with_capacity(chunk.len());

        for ch in chunk.chars() {
            if !self.started {
                if ch == '"' || ch.is_whitespace() {
                    continue;
                }
                self.started = true;
            }

            match ch {
                '\r' => {}
                '\n' => {
                    // Whitespace-only lines count as blank
                    let kept = self.pending.trim_end_matches(|c| c == ' ' || c == '\t').len();
                    self.pending.truncate(kept);
                    self.pending.push('\n');
                }
                '"' => self.pending.push('"'),
                ' ' | '\t' if !self.pending.is_empty() => self.pending.push(ch),
                _ => {
                    self.flush_pending(&mut out);
                    out.push(ch);
                }
            }
        }

        out
    }

    /// End of stream: trailing quotes and blank lines are dropped
    pub fn finish(&mut self) -> String {
        self.pending.clear();
        if self.started {
            "\n".to_string()
        } else {
            String::new()
        }
    }

    fn flush_pending(&mut self, out: &mut String) {
        let mut newlines = 0;
        for ch in self.pending.chars() {
            if ch == '\n' {
                newlines += 1;
                if newlines > MAX_NEWLINES {
                    continue;
                }
            } else {
                newlines = 0;
            }
            out.push(ch);
        }
        self.pending.clear();
    }
}

/// Normalize a complete text in one go
pub fn normalize(text: &str) -> String {
    let mut normalizer = MarkdownNormalizer::new();
    let mut out = normalizer.push(text);
    out.push_str(&normalizer.finish());
    out
}
