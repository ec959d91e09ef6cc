//! Candidate eligibility as a chain of filters.
//!
//! Ranking scores only the courses that survive every filter, so the
//! pipeline runs before any similarity is computed.

use crate::filters::{DepartmentFilter, ExcludeCodesFilter, LevelFilter};
use crate::traits::{Candidate, CourseFilter, Filter};
use anyhow::Result;

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(LevelFilter)
///     .add_filter(DepartmentFilter);
///
/// let eligible = pipeline.apply(candidates, &CourseFilter::levels([300, 400]))?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// The pipeline used for course ranking: level, department, then
    /// explicit exclusions.
    pub fn standard() -> Self {
        Self::new()
            .add_filter(LevelFilter)
            .add_filter(DepartmentFilter)
            .add_filter(ExcludeCodesFilter)
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Apply all filters in sequence to the candidates.
    ///
    /// An unrestricted `filter` short-circuits and returns the input as is.
    pub fn apply<'c>(
        &self,
        candidates: Vec<Candidate<'c>>,
        filter: &CourseFilter,
    ) -> Result<Vec<Candidate<'c>>> {
        if filter.is_unrestricted() {
            return Ok(candidates);
        }

        let mut current = candidates;
        for f in &self.filters {
            tracing::debug!(
                "Applying filter: {} (input count: {})",
                f.name(),
                current.len()
            );
            current = f.apply(current, filter)?;
            tracing::debug!(
                "Filter applied: {} (output count: {})",
                f.name(),
                current.len()
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::standard()
    }
}
