//! Catalog building and indexing logic.
//!
//! Turns parsed courses into a validated, read-only [`Catalog`]:
//! - validate dimensions, values and codes
//! - build the code, level and department indices
//! - precompute embedding norms in parallel

use crate::error::{CatalogError, Result};
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::info;

impl Catalog {
    /// Load a catalog file and build the in-memory table.
    ///
    /// The returned catalog is complete and validated; any malformed record
    /// or dimension disagreement fails the whole load.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading course catalog from {:?}", path);

        let courses = parser::parse_catalog_file(path)?;
        let catalog = Self::from_courses(courses)?;

        info!(
            courses = catalog.len(),
            dimension = catalog.dimension(),
            levels = catalog.level_index.len(),
            "Course catalog loaded and validated"
        );
        Ok(catalog)
    }

    /// Load a catalog and additionally require a specific embedding dimension
    pub fn load_with_dimension(path: &Path, expected_dimension: usize) -> Result<Self> {
        let catalog = Self::load_from_file(path)?;
        catalog.ensure_dimension(expected_dimension)?;
        Ok(catalog)
    }

    /// Build a catalog from already-parsed courses, keeping their order
    pub fn from_courses(courses: Vec<Course>) -> Result<Self> {
        let dimension = validate(&courses)?;

        let mut catalog = Catalog {
            courses,
            norms: Vec::new(),
            dimension,
            code_index: HashMap::new(),
            level_index: BTreeMap::new(),
            department_index: BTreeMap::new(),
        };
        catalog.build_indices();
        catalog.compute_norms();
        Ok(catalog)
    }

    /// Fail with `DimensionMismatch` if the catalog is not `expected` wide
    pub fn ensure_dimension(&self, expected: usize) -> Result<()> {
        if self.dimension != expected {
            return Err(CatalogError::DimensionMismatch {
                code: "<catalog>".to_string(),
                expected,
                found: self.dimension,
            });
        }
        Ok(())
    }

    fn build_indices(&mut self) {
        for (position, course) in self.courses.iter().enumerate() {
            self.code_index.insert(course.code.clone(), position);

            self.level_index
                .entry(course.level)
                .or_insert_with(Vec::new)
                .push(position);

            if let Some(department) = &course.department {
                self.department_index
                    .entry(department.clone())
                    .or_insert_with(Vec::new)
                    .push(position);
            }
        }
    }

    fn compute_norms(&mut self) {
        self.norms = self
            .courses
            .par_iter()
            .map(|course| vector_norm(&course.embedding))
            .collect();
    }
}

/// Validate catalog integrity and return the shared embedding dimension.
///
/// Checks that:
/// - the catalog is non-empty
/// - every embedding is non-empty, finite and as wide as the first one
/// - every level is a multiple of 100 within range
/// - course codes are unique
pub fn validate(courses: &[Course]) -> Result<usize> {
    let first = courses.first().ok_or(CatalogError::Empty)?;
    let dimension = first.embedding.len();
    if dimension == 0 {
        return Err(CatalogError::InvalidValue {
            field: format!("embedding of {}", first.code),
            value: "[]".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(courses.len());
    for course in courses {
        if course.embedding.len() != dimension {
            return Err(CatalogError::DimensionMismatch {
                code: course.code.clone(),
                expected: dimension,
                found: course.embedding.len(),
            });
        }
        if course.embedding.iter().any(|x| !x.is_finite()) {
            return Err(CatalogError::InvalidValue {
                field: format!("embedding of {}", course.code),
                value: "non-finite component".to_string(),
            });
        }
        if !is_valid_level(course.level as i64) {
            return Err(CatalogError::InvalidValue {
                field: format!("level of {}", course.code),
                value: course.level.to_string(),
            });
        }
        if !seen.insert(course.code.as_str()) {
            return Err(CatalogError::DuplicateCode(course.code.clone()));
        }
    }

    Ok(dimension)
}

/// Euclidean norm of a vector
pub fn vector_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}
