//! Recommendation engine for university courses.
//!
//! This crate turns a free-text description of a student's interests into
//! a ranked, explained list of courses. It wires together:
//! - [`RateLimiter`]: per-identity request windows
//! - [`QueryEmbedder`]: query text to vector via the embedding backend
//! - `pipeline::SimilarityRanker`: level pre-filter and cosine top-K
//! - [`ExplanationGenerator`]: streamed markdown write-up
//! - [`RecommendationOrchestrator`]: the per-request state machine

pub mod config;
pub mod embedder;
pub mod error;
pub mod explainer;
pub mod orchestrator;
pub mod query;
pub mod rate_limiter;

pub use config::{EngineConfig, QueryExpansion};
pub use embedder::QueryEmbedder;
pub use error::{EngineError, Result};
pub use explainer::{
    CourseSummary, ExplanationGenerator, ExplanationStream, MatchSummary, StreamOutcome,
};
pub use orchestrator::{Recommendation, RecommendationOrchestrator, RequestState};
pub use query::{Query, RecommendationRequest};
pub use rate_limiter::{EvictorGuard, RateLimiter};
