//! Error types for pixel operations.

use thiserror::Error;

/// Result type alias for operations in this crate.
pub type OpsResult<T> = std::result::Result<T, OpsError>;

/// Errors raised by pixel operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// A parameter was outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error bubbled up from a core buffer operation.
    #[error(transparent)]
    Core(#[from] plx_core::Error),
}

impl OpsError {
    /// Creates an [`OpsError::InvalidParameter`].
    #[inline]
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}
