//! Similarity ranking over the course catalog.
//!
//! ## Algorithm
//! 1. Wrap every catalog course as a candidate, in catalog order
//! 2. Run the filter pipeline (level pre-filter etc.) before scoring
//! 3. Score the survivors in parallel against the query vector
//! 4. Stable sort by descending score, drop scores under the floor
//! 5. Truncate to top-K
//!
//! Ranking is pure in-memory work; it never blocks on I/O.

use crate::filter_pipeline::FilterPipeline;
use crate::similarity::cosine_with_norms;
use crate::traits::{Candidate, CourseFilter};
use catalog::{Catalog, Course, Position, vector_norm};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, instrument};

/// A course paired with its similarity to the query
#[derive(Debug, Clone, Copy)]
pub struct RankedMatch<'c> {
    pub course: &'c Course,
    pub score: f32,
    pub position: Position,
}

#[derive(Error, Debug)]
pub enum RankError {
    #[error("Query vector has dimension {found}, catalog expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Candidate filtering failed: {0}")]
    Filter(#[from] anyhow::Error),
}

/// Scores catalog courses against a query embedding.
pub struct SimilarityRanker {
    pipeline: FilterPipeline,
    min_score: Option<f32>,
}

impl SimilarityRanker {
    pub fn new() -> Self {
        Self {
            pipeline: FilterPipeline::standard(),
            min_score: None,
        }
    }

    /// Use a custom filter pipeline instead of the standard one
    pub fn with_pipeline(mut self, pipeline: FilterPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Drop matches scoring below `min_score`
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn min_score(&self) -> Option<f32> {
        self.min_score
    }

    /// Rank the catalog against `query`.
    ///
    /// Returns at most `top_k` matches sorted by descending score; equal
    /// scores keep catalog order. An empty result is a normal outcome.
    #[instrument(skip(self, query, catalog, filter), fields(courses = catalog.len()))]
    pub fn rank<'c>(
        &self,
        query: &[f32],
        catalog: &'c Catalog,
        filter: &CourseFilter,
        top_k: usize,
    ) -> Result<Vec<RankedMatch<'c>>, RankError> {
        if query.len() != catalog.dimension() {
            return Err(RankError::DimensionMismatch {
                expected: catalog.dimension(),
                found: query.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let candidates: Vec<Candidate<'c>> = catalog
            .all()
            .iter()
            .enumerate()
            .map(|(position, course)| Candidate { position, course })
            .collect();
        let candidates = self.pipeline.apply(candidates, filter)?;
        let eligible = candidates.len();

        let query_norm = vector_norm(query);
        let mut matches: Vec<RankedMatch<'c>> = candidates
            .into_par_iter()
            .map(|candidate| {
                let course_norm = catalog
                    .norm(candidate.position)
                    .unwrap_or_else(|| vector_norm(&candidate.course.embedding));
                RankedMatch {
                    course: candidate.course,
                    score: cosine_with_norms(
                        query,
                        query_norm,
                        &candidate.course.embedding,
                        course_norm,
                    ),
                    position: candidate.position,
                }
            })
            .collect();

        if let Some(floor) = self.min_score {
            matches.retain(|m| m.score >= floor);
        }

        // sort_by is stable and the input is in catalog order
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);

        debug!(
            eligible,
            returned = matches.len(),
            top_score = matches.first().map(|m| m.score),
            "Ranked catalog"
        );
        Ok(matches)
    }
}

impl Default for SimilarityRanker {
    fn default() -> Self {
        Self::new()
    }
}
