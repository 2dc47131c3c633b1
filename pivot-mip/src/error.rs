//! Error types for the integer layer.

use pivot_core::ModelError;
use thiserror::Error;

/// Errors raised by branch-and-bound or Lagrangian setup.
#[derive(Error, Debug)]
pub enum MipError {
    /// The problem handed over is not usable as stated.
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// An underlying model operation failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type for MIP operations.
pub type MipResult<T> = Result<T, MipError>;
