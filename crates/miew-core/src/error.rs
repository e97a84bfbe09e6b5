//! Error types for miew-rs.

use thiserror::Error;

/// The main error type for miew-rs operations.
#[derive(Error, Debug)]
pub enum MiewError {
    /// The voxel basis is left-handed, not axis-aligned, or leaves the positive octant.
    #[error("unsupported volume geometry: {0}")]
    UnsupportedGeometry(String),

    /// An item index past the capacity fixed at construction.
    #[error("index {index} out of range for {count} items")]
    IndexOutOfRange { index: usize, count: usize },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Volume item size outside the supported 1..=3 range.
    #[error("invalid volume vector size {0} (expected 1, 2 or 3)")]
    InvalidVectorSize(usize),

    /// A numeric parameter that the algorithm cannot work with.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl MiewError {
    /// Shorthand for a checked-capacity failure.
    pub fn out_of_range(index: usize, count: usize) -> Self {
        Self::IndexOutOfRange { index, count }
    }
}

/// A specialized Result type for miew-rs operations.
pub type Result<T> = std::result::Result<T, MiewError>;
