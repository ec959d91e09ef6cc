//! Error taxonomy for recommendation requests.

use std::time::Duration;

use catalog::CatalogError;
use pipeline::RankError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Empty text, over-long text or malformed levels. Never retried.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unknown course: {0}")]
    UnknownCourse(String),

    /// Dimension disagreement or invalid settings; fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Whether the caller may reasonably try the same request again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::RateLimited { .. }
                | EngineError::EmbeddingUnavailable(_)
                | EngineError::GenerationUnavailable(_)
                | EngineError::Timeout(_)
        )
    }

    /// Short machine-readable name, used in logs and request states
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidQuery(_) => "invalid_query",
            EngineError::RateLimited { .. } => "rate_limited",
            EngineError::EmbeddingUnavailable(_) => "embedding_unavailable",
            EngineError::GenerationUnavailable(_) => "generation_unavailable",
            EngineError::Timeout(_) => "timeout",
            EngineError::UnknownCourse(_) => "unknown_course",
            EngineError::Configuration(_) => "configuration",
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

impl From<RankError> for EngineError {
    fn from(err: RankError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
