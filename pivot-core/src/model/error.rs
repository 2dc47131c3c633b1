//! Error types for model construction and mutation.

use thiserror::Error;

/// Errors raised synchronously by malformed model operations.
///
/// These are construction errors in the caller's hands; the engine never
/// retries them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A row or column index outside its valid range.
    #[error("{kind} index {index} out of range [{lo}, {hi}]")]
    InvalidRange {
        /// What kind of index was out of range ("row", "column", "index").
        kind: &'static str,
        /// The offending index.
        index: usize,
        /// Lowest valid value.
        lo: usize,
        /// Highest valid value.
        hi: usize,
    },

    /// A bound update that would cross the opposite bound.
    #[error("bound order violation on index {index}: lower {lower} > upper {upper}")]
    BoundOrder {
        /// The unified index whose bounds would cross.
        index: usize,
        /// Resulting lower bound.
        lower: f64,
        /// Resulting upper bound.
        upper: f64,
    },

    /// A lower bound must be finite.
    #[error("lower bound of index {index} must be finite, got {value}")]
    InfiniteLower {
        /// The unified index.
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// A slice argument had the wrong length.
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
