//! LeafScan Core
//!
//! Core types and utilities shared across LeafScan components.
//!
//! This crate provides:
//! - The diagnosis data model returned by the `/predict` endpoint
//! - Disease class identifiers and severity bucketing
//! - The ordered label table and treatment catalog
//! - Error types and result handling

pub mod catalog;
pub mod error;
pub mod types;

pub use catalog::{Catalog, CatalogEntry};
pub use error::{Error, Result};
pub use types::{Diagnosis, DiseaseClass, SeverityTier, NOT_A_PLANT};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::Catalog;
    pub use crate::error::{Error, Result};
    pub use crate::types::{Diagnosis, DiseaseClass, SeverityTier};
}
