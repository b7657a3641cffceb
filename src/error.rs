//! Error types for carta.

use thiserror::Error;

/// Errors that can occur while encoding, indexing, or laying out a dataset.
///
/// All of these indicate caller misuse or malformed data; none are transient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CartaError {
    /// Input data is malformed (dimension mismatch, out-of-range position, bad edge).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A parameter or configuration value is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The forest was queried before `build_index()`.
    #[error("forest is not indexed; call build_index() before querying")]
    NotIndexed,

    /// The forest was modified or re-indexed after `build_index()`.
    #[error("forest is already indexed")]
    AlreadyIndexed,

    /// Zero items were supplied where at least one is required.
    #[error("dataset is empty")]
    EmptyDataset,
}

pub type Result<T> = std::result::Result<T, CartaError>;
