//! Pull-based stream of generated text chunks.
//!
//! A `TextStream` is finite and not restartable. The producing side holds a
//! [`TextSender`]; once the consumer drops the stream, `TextSender::closed`
//! resolves and producers are expected to stop work and release upstream
//! resources.

use tokio::sync::mpsc;

use crate::ModelClientError;

type Item = Result<String, ModelClientError>;

/// Consumer half: yields chunks in production order
#[derive(Debug)]
pub struct TextStream {
    receiver: mpsc::Receiver<Item>,
    finished: bool,
}

/// Producer half of a [`TextStream`]
#[derive(Debug, Clone)]
pub struct TextSender {
    sender: mpsc::Sender<Item>,
}

impl TextStream {
    /// Create a connected sender/stream pair with a bounded buffer
    pub fn channel(capacity: usize) -> (TextSender, TextStream) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            TextSender { sender },
            TextStream {
                receiver,
                finished: false,
            },
        )
    }

    /// A stream that yields the given chunks and then ends
    pub fn from_chunks<I, S>(chunks: I) -> TextStream
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks: Vec<String> = chunks.into_iter().map(Into::into).collect();
        let (sender, stream) = TextStream::channel(chunks.len());
        for chunk in chunks {
            // Capacity matches the chunk count, so this cannot be full
            let _ = sender.sender.try_send(Ok(chunk));
        }
        stream
    }

    /// Next chunk, `Some(Err(_))` once on failure, then `None` forever
    pub async fn next(&mut self) -> Option<Item> {
        if self.finished {
            return None;
        }

        match self.receiver.recv().await {
            Some(Ok(chunk)) => Some(Ok(chunk)),
            Some(Err(e)) => {
                self.finished = true;
                self.receiver.close();
                Some(Err(e))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    /// Drain the stream into a single string
    pub async fn collect_text(mut self) -> Result<String, ModelClientError> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

impl TextSender {
    /// Send a chunk; returns false when the consumer has gone away
    pub async fn send_chunk(&self, chunk: impl Into<String>) -> bool {
        self.sender.send(Ok(chunk.into())).await.is_ok()
    }

    /// Terminate the stream with an error
    pub async fn fail(self, error: ModelClientError) {
        let _ = self.sender.send(Err(error)).await;
    }

    /// Resolves once the consumer has dropped its [`TextStream`]
    pub async fn closed(&self) {
        self.sender.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
