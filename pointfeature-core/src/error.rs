//! Error types for pointfeature

use thiserror::Error;

/// Main error type for pointfeature operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A normal-dependent computation was requested on a point set without
    /// a normal per point.
    #[error("{required_by} requires one normal per point (points: {points}, normals: {normals})")]
    MissingNormals {
        required_by: String,
        points: usize,
        normals: usize,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Operation cancelled after {processed} points")]
    Cancelled { processed: usize },
}

/// Result type alias for pointfeature operations
pub type Result<T> = std::result::Result<T, Error>;
