//! Candidate filtering and similarity ranking for course recommendations.
//!
//! This crate provides:
//! - Filter trait and implementations for candidate filtering
//! - FilterPipeline for composing filters
//! - SimilarityRanker, which scores the catalog against a query embedding
//!
//! ## Architecture
//! Ranking processes the catalog in stages:
//! 1. Filters remove courses the request excludes (level, department, codes)
//! 2. Remaining courses are scored by cosine similarity to the query
//! 3. Scores are sorted (stable, descending) and truncated to top-K
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{CourseFilter, SimilarityRanker};
//!
//! let ranker = SimilarityRanker::new();
//! let matches = ranker.rank(&query_vector, &catalog, &CourseFilter::levels([300, 400]), 10)?;
//! ```

pub mod filter_pipeline;
pub mod filters;
pub mod ranker;
pub mod similarity;
pub mod traits;

// Re-export main types
pub use filter_pipeline::FilterPipeline;
pub use ranker::{RankError, RankedMatch, SimilarityRanker};
pub use similarity::{cosine_similarity, cosine_with_norms};
pub use traits::{Candidate, CourseFilter, Filter};
