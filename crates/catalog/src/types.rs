//! Core domain types for the course catalog.
//!
//! This module defines the immutable course record and the in-memory
//! `Catalog` that owns every course together with its lookup indices.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Type Aliases
// =============================================================================

/// Course level, e.g. 100 for introductory or 500 for graduate courses.
/// Always a multiple of 100 in `MIN_LEVEL..=MAX_LEVEL`.
pub type Level = u16;

/// Position of a course in catalog (insertion) order
pub type Position = usize;

/// Lowest level a course may carry
pub const MIN_LEVEL: Level = 100;

/// Highest level a course may carry
pub const MAX_LEVEL: Level = 900;

/// Returns true when `level` is a multiple of 100 within the accepted range
pub fn is_valid_level(level: i64) -> bool {
    level >= MIN_LEVEL as i64 && level <= MAX_LEVEL as i64 && level % 100 == 0
}

// =============================================================================
// Course
// =============================================================================

/// A single catalog entry with its precomputed embedding.
///
/// Courses are immutable once the catalog has been loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Unique course code, e.g. "EECS445"
    pub code: String,
    pub title: String,
    pub description: String,
    pub level: Level,
    /// Owning department, when the source dataset records one
    #[serde(default)]
    pub department: Option<String>,
    /// Dense embedding of the course text; identical dimension for every course
    pub embedding: Vec<f32>,
}

// =============================================================================
// Statistics
// =============================================================================

/// Summary of a loaded catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_courses: usize,
    pub embedding_dimension: usize,
    /// Number of courses at each level, ascending by level
    pub courses_per_level: BTreeMap<Level, usize>,
    pub departments: usize,
}

// =============================================================================
// Catalog - The In-Memory Course Table
// =============================================================================

/// Read-only table of courses plus indices for lookups.
///
/// Built once by [`Catalog::load_from_file`] or [`Catalog::from_courses`];
/// no mutation API is exposed after construction, so an `Arc<Catalog>` can
/// be shared between concurrent requests without locking.
#[derive(Debug)]
pub struct Catalog {
    pub(crate) courses: Vec<Course>,
    /// Euclidean norm of each course embedding, parallel to `courses`
    pub(crate) norms: Vec<f32>,
    pub(crate) dimension: usize,

    pub(crate) code_index: HashMap<String, Position>,
    pub(crate) level_index: BTreeMap<Level, Vec<Position>>,
    pub(crate) department_index: BTreeMap<String, Vec<Position>>,
}

impl Catalog {
    /// All courses in catalog order
    pub fn all(&self) -> &[Course] {
        &self.courses
    }

    /// Get a course by its code
    pub fn get(&self, code: &str) -> Option<&Course> {
        self.position(code).map(|position| &self.courses[position])
    }

    /// Catalog position of a course code
    pub fn position(&self, code: &str) -> Option<Position> {
        self.code_index.get(code).copied()
    }

    /// Precomputed embedding norm of the course at `position`
    pub fn norm(&self, position: Position) -> Option<f32> {
        self.norms.get(position).copied()
    }

    /// Embedding dimension shared by every course
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Distinct levels present in the catalog, ascending
    pub fn levels(&self) -> Vec<Level> {
        self.level_index.keys().copied().collect()
    }

    /// Courses at a given level, in catalog order
    pub fn courses_at_level(&self, level: Level) -> Vec<&Course> {
        self.level_index
            .get(&level)
            .map(|positions| positions.iter().map(|&p| &self.courses[p]).collect())
            .unwrap_or_default()
    }

    /// Distinct department names, ascending
    pub fn departments(&self) -> Vec<&str> {
        self.department_index.keys().map(String::as_str).collect()
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            total_courses: self.courses.len(),
            embedding_dimension: self.dimension,
            courses_per_level: self
                .level_index
                .iter()
                .map(|(&level, positions)| (level, positions.len()))
                .collect(),
            departments: self.department_index.len(),
        }
    }

    /// Case-insensitive text search over code, title and description.
    ///
    /// Code and title hits rank ahead of description-only hits; within a
    /// tier, results keep catalog order.
    pub fn search_text(&self, text: &str, limit: usize) -> Vec<&Course> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut strong = Vec::new();
        let mut weak = Vec::new();
        for course in &self.courses {
            if course.code.to_lowercase().contains(&needle)
                || course.title.to_lowercase().contains(&needle)
            {
                strong.push(course);
            } else if course.description.to_lowercase().contains(&needle) {
                weak.push(course);
            }
        }

        strong.extend(weak);
        strong.truncate(limit);
        strong
    }
}
