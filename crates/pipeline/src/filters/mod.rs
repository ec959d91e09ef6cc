//! Filter implementations for the candidate pipeline.
//!
//! This module contains all the concrete filter implementations
//! that can be composed into a FilterPipeline.

pub mod department;
pub mod exclude;
pub mod level;

// Re-export for convenience
pub use department::DepartmentFilter;
pub use exclude::ExcludeCodesFilter;
pub use level::LevelFilter;
