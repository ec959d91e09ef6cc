//! Model client for the external inference service.
//!
//! The recommendation engine treats embedding and text generation as black
//! boxes. This crate defines those two capabilities as traits and provides a
//! gRPC implementation that talks to the inference sidecar described in
//! `proto/inference.proto`. It handles:
//! - Connection management to the inference service
//! - Converting Rust types to protobuf messages
//! - Streaming generated text back as a cancellable [`TextStream`]
//! - Timeouts and error translation

use async_trait::async_trait;
use thiserror::Error;

// Include the generated protobuf code
pub mod inference {
    tonic::include_proto!("inference");
}

pub mod client;
pub mod stream;

pub use client::{ClientOptions, InferenceClient};
pub use stream::{TextSender, TextStream};

/// Errors that can occur when interacting with the inference service
#[derive(Error, Debug)]
pub enum ModelClientError {
    #[error("Failed to connect to inference service: {0}")]
    Connection(String),

    #[error("Embedding request failed: {0}")]
    Embedding(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid response from inference service: {0}")]
    InvalidResponse(String),

    #[error("Inference call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat-style generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: f32,
    /// Upper bound on generated tokens; `None` leaves it to the service
    pub max_tokens: Option<u32>,
}

/// "Given text, return a vector"
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelClientError>;
}

/// "Given a prompt, return streamed text"
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Start generating; chunks arrive on the returned stream as they are produced
    async fn generate(&self, request: GenerationRequest) -> Result<TextStream, ModelClientError>;

    /// Generate and wait for the full text
    async fn complete(&self, request: GenerationRequest) -> Result<String, ModelClientError> {
        self.generate(request).await?.collect_text().await
    }
}
