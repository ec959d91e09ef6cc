//! Streamed natural-language explanations for a ranked match list.
//!
//! The generator composes a prompt from the query and the match summaries
//! and hands back the generation capability's chunks as they arrive. An
//! empty match list never reaches the external capability: it gets a fixed
//! "no suitable courses" write-up instead.

use std::sync::Arc;
use std::time::Duration;

use catalog::{Course, Level};
use model_client::{GenerationBackend, GenerationRequest, Message, TextStream};
use pipeline::RankedMatch;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::query::Query;

/// Owned view of a course, without its embedding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub code: String,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub department: Option<String>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            code: course.code.clone(),
            title: course.title.clone(),
            description: course.description.clone(),
            level: course.level,
            department: course.department.clone(),
        }
    }
}

/// A ranked course as handed to callers and to the prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    #[serde(flatten)]
    pub course: CourseSummary,
    pub score: f32,
}

impl From<&RankedMatch<'_>> for MatchSummary {
    fn from(m: &RankedMatch<'_>) -> Self {
        Self {
            course: CourseSummary::from(m.course),
            score: m.score,
        }
    }
}

/// How an explanation stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Still producing
    Pending,
    /// Every chunk was delivered
    Complete,
    /// Stopped early; the chunks already delivered stand
    Truncated,
}

/// Finite, non-restartable sequence of explanation chunks.
///
/// A failure is delivered once, as a terminal `Err` after the chunks that
/// were already emitted. Dropping the stream cancels generation.
pub struct ExplanationStream {
    inner: TextStream,
    outcome: StreamOutcome,
    deadline: Option<(Instant, Duration)>,
    request_id: Option<Uuid>,
    chunks: usize,
}

impl ExplanationStream {
    fn new(inner: TextStream) -> Self {
        Self {
            inner,
            outcome: StreamOutcome::Pending,
            deadline: None,
            request_id: None,
            chunks: 0,
        }
    }

    /// A stream that yields `text` as a single chunk
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(TextStream::from_chunks([text.into()]))
    }

    /// Fail with `Timeout(timeout)` if the stream is still running at `at`
    pub fn with_deadline(mut self, at: Instant, timeout: Duration) -> Self {
        self.deadline = Some((at, timeout));
        self
    }

    pub(crate) fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn outcome(&self) -> StreamOutcome {
        self.outcome
    }

    /// Chunks delivered so far
    pub fn chunks_emitted(&self) -> usize {
        self.chunks
    }

    pub async fn next(&mut self) -> Option<Result<String>> {
        if self.outcome != StreamOutcome::Pending {
            return None;
        }

        let item = match self.deadline {
            Some((at, timeout)) => match tokio::time::timeout_at(at, self.inner.next()).await {
                Ok(item) => item,
                Err(_) => return Some(Err(self.truncate(EngineError::Timeout(timeout)))),
            },
            None => self.inner.next().await,
        };

        match item {
            Some(Ok(chunk)) => {
                self.chunks += 1;
                Some(Ok(chunk))
            }
            Some(Err(e)) => Some(Err(
                self.truncate(EngineError::GenerationUnavailable(e.to_string()))
            )),
            None => {
                self.outcome = StreamOutcome::Complete;
                info!(
                    request_id = ?self.request_id,
                    chunks = self.chunks,
                    state = "done",
                    "Explanation complete"
                );
                None
            }
        }
    }

    /// Drain the stream into one string, failing on the first error
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }

    fn truncate(&mut self, error: EngineError) -> EngineError {
        self.outcome = StreamOutcome::Truncated;
        // Drop the upstream receiver so the producer stops generating
        self.inner = TextStream::from_chunks(Vec::<String>::new());
        warn!(
            request_id = ?self.request_id,
            chunks = self.chunks,
            state = "failed",
            reason = error.kind(),
            "Explanation truncated: {}",
            error
        );
        error
    }
}

pub struct ExplanationGenerator {
    backend: Arc<dyn GenerationBackend>,
    model: String,
    max_tokens: Option<u32>,
}

impl ExplanationGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Start explaining `matches` for `query`.
    ///
    /// Returns as soon as the first chunk can be awaited; nothing is
    /// buffered ahead of the caller.
    pub async fn explain(&self, query: &Query, matches: &[MatchSummary]) -> Result<ExplanationStream> {
        if matches.is_empty() {
            debug!("No matches, using fixed explanation");
            return Ok(ExplanationStream::from_text(no_matches_explanation(query)));
        }

        let request = GenerationRequest {
            messages: vec![Message::system(recommendation_prompt(query, matches))],
            model: self.model.clone(),
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let stream = self.backend.generate(request).await.map_err(|e| {
            warn!("Failed to start explanation: {}", e);
            EngineError::GenerationUnavailable(e.to_string())
        })?;
        Ok(ExplanationStream::new(stream))
    }
}

/// Deterministic markdown used when nothing survived filtering
pub fn no_matches_explanation(query: &Query) -> String {
    let mut text = String::from("### No suitable courses found\n\n");
    if query.levels().is_empty() {
        text.push_str("No course in the catalog matched your request");
    } else {
        let levels: Vec<String> = query.levels().iter().map(|l| l.to_string()).collect();
        text.push_str(&format!(
            "No course at level {} matched your request",
            levels.join(" or ")
        ));
    }
    text.push_str(&format!(" \"{}\".\n\n", query.text()));
    text.push_str(
        "Try describing your interests in different words, or widen the level filter.\n",
    );
    text
}

/// System prompt listing each course as `CODE: Title (level N)` followed by
/// its description
pub fn recommendation_prompt(query: &Query, matches: &[MatchSummary]) -> String {
    let courses = matches
        .iter()
        .map(|m| {
            format!(
                "{}: {} (level {})\n{}",
                m.course.code, m.course.title, m.course.level, m.course.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You recommend university courses to a student.\n\
         \n\
         Student request: {query}\n\
         \n\
         Course options:\n\
         {courses}\n\
         \n\
         Rank up to {count} of the course options above by how well they fit the request. \
         Recommend only courses from the list. For each course give:\n\
         1. **CODE: Title** as a numbered markdown heading line\n\
         2. Rationale: two sentences on why it fits this student\n\
         3. Confidence: High, Medium or Low\n\
         \n\
         Do not give general academic advice and do not mention prerequisites \
         unless a description states them.",
        query = query.text(),
        courses = courses,
        count = matches.len(),
    )
}
