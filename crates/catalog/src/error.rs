//! Error types for the catalog crate.
//!
//! Every variant here is fatal for the engine: a catalog that fails to load
//! or validate means the process cannot serve recommendations.

use thiserror::Error;

/// Errors that can occur while loading and validating a course catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// File could not be found or opened
    #[error("Failed to open catalog file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading the file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A record in the catalog file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// The file extension does not name a supported format
    #[error("Unsupported catalog format: {0} (expected .jsonl or .json)")]
    UnsupportedFormat(String),

    /// A field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// A course embedding disagrees with the catalog dimension
    #[error("Embedding dimension mismatch for {code}: expected {expected}, found {found}")]
    DimensionMismatch {
        code: String,
        expected: usize,
        found: usize,
    },

    /// Two records share the same course code
    #[error("Duplicate course code: {0}")]
    DuplicateCode(String),

    /// The catalog contains no courses
    #[error("Catalog is empty")]
    Empty,
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
