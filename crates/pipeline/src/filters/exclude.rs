//! Drops explicitly excluded course codes, e.g. the source course of a
//! similar-course lookup.

use crate::traits::{Candidate, CourseFilter, Filter};
use anyhow::Result;

pub struct ExcludeCodesFilter;

impl Filter for ExcludeCodesFilter {
    fn name(&self) -> &str {
        "ExcludeCodesFilter"
    }

    fn apply<'c>(
        &self,
        candidates: Vec<Candidate<'c>>,
        filter: &CourseFilter,
    ) -> Result<Vec<Candidate<'c>>> {
        if filter.exclude_codes.is_empty() {
            return Ok(candidates);
        }

        Ok(candidates
            .into_iter()
            .filter(|candidate| !filter.exclude_codes.contains(&candidate.course.code))
            .collect())
    }
}
