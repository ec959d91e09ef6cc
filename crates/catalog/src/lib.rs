//! # Catalog Crate
//!
//! In-memory course catalog for the recommendation engine.
//!
//! ## Main Components
//!
//! - **types**: `Course`, `Catalog`, `CatalogStats` and level helpers
//! - **parser**: Parse `.jsonl` / `.json` catalog files into courses
//! - **index**: Validate, index and precompute norms
//! - **error**: Error types for catalog loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::Catalog;
//! use std::path::Path;
//!
//! let catalog = Catalog::load_from_file(Path::new("data/courses.jsonl"))?;
//! let course = catalog.get("EECS445").unwrap();
//! println!("{} has a {}-dimensional embedding", course.code, catalog.dimension());
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod index;

pub use error::{CatalogError, Result};
pub use index::vector_norm;
pub use types::{
    Catalog, CatalogStats, Course, Level, MAX_LEVEL, MIN_LEVEL, Position, is_valid_level,
};
