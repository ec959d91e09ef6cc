//! Restricts candidates to a set of departments.

use crate::traits::{Candidate, CourseFilter, Filter};
use anyhow::Result;

/// Keeps candidates whose department is in `CourseFilter::departments`.
///
/// Matching is case-insensitive. Courses without a department never match
/// a non-empty department set.
pub struct DepartmentFilter;

impl Filter for DepartmentFilter {
    fn name(&self) -> &str {
        "DepartmentFilter"
    }

    fn apply<'c>(
        &self,
        candidates: Vec<Candidate<'c>>,
        filter: &CourseFilter,
    ) -> Result<Vec<Candidate<'c>>> {
        if filter.departments.is_empty() {
            return Ok(candidates);
        }

        Ok(candidates
            .into_iter()
            .filter(|candidate| match &candidate.course.department {
                Some(department) => filter
                    .departments
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(department)),
                None => false,
            })
            .collect())
    }
}
