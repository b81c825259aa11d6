//! Catalog assembly error types

use thiserror::Error;

/// Errors that can occur while assembling a catalog graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// An edge names a resource that is not in the catalog
    #[error("Edge {source_key} - {relationship} - {target_key} references missing resource {missing}")]
    DanglingEdge {
        source_key: String,
        target_key: String,
        relationship: String,
        missing: String,
    },
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
