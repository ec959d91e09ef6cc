//! Level pre-filter.
//!
//! Runs before scoring, so it changes which courses can reach the top-K
//! rather than just hiding rows from the output.

use crate::traits::{Candidate, CourseFilter, Filter};
use anyhow::Result;

/// Keeps candidates whose level is in `CourseFilter::levels`.
/// An empty level set keeps everything.
pub struct LevelFilter;

impl Filter for LevelFilter {
    fn name(&self) -> &str {
        "LevelFilter"
    }

    fn apply<'c>(
        &self,
        candidates: Vec<Candidate<'c>>,
        filter: &CourseFilter,
    ) -> Result<Vec<Candidate<'c>>> {
        if filter.levels.is_empty() {
            return Ok(candidates);
        }

        Ok(candidates
            .into_iter()
            .filter(|candidate| filter.levels.contains(&candidate.course.level))
            .collect())
    }
}
