//! Core traits for the filtering pipeline.
//!
//! This module defines the Filter trait that allows composable,
//! extensible filters to be applied to candidate sets before scoring.

use anyhow::Result;
use catalog::{Course, Level, Position};
use std::collections::{BTreeSet, HashSet};

/// A course that is still eligible for ranking.
///
/// `position` is the course's catalog position; candidates are kept in
/// ascending position order so ties in score resolve to catalog order.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'c> {
    pub position: Position,
    pub course: &'c Course,
}

/// Request-scoped restrictions on which courses may be ranked.
///
/// Empty sets mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilter {
    pub levels: BTreeSet<Level>,
    pub departments: BTreeSet<String>,
    pub exclude_codes: HashSet<String>,
}

impl CourseFilter {
    /// Filter accepting only the given levels
    pub fn levels(levels: impl IntoIterator<Item = Level>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_departments<S: Into<String>>(
        mut self,
        departments: impl IntoIterator<Item = S>,
    ) -> Self {
        self.departments = departments.into_iter().map(Into::into).collect();
        self
    }

    pub fn excluding(mut self, code: impl Into<String>) -> Self {
        self.exclude_codes.insert(code.into());
        self
    }

    /// True when the filter accepts every course
    pub fn is_unrestricted(&self) -> bool {
        self.levels.is_empty() && self.departments.is_empty() && self.exclude_codes.is_empty()
    }
}

/// Core trait for filtering candidates.
///
/// All filters must implement this trait to be used in the FilterPipeline.
///
/// ## Design Note
/// - `Send + Sync` allows filters to be shared between concurrent requests
/// - Filters take ownership of the Vec<Candidate> and return a filtered Vec
/// - Filters must preserve the relative order of the candidates they keep
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to a set of candidates.
    ///
    /// # Arguments
    /// * `candidates` - The candidates to filter (takes ownership)
    /// * `filter` - Restrictions carried by the current request
    fn apply<'c>(
        &self,
        candidates: Vec<Candidate<'c>>,
        filter: &CourseFilter,
    ) -> Result<Vec<Candidate<'c>>>;
}
