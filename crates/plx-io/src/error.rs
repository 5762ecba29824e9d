//! Error types for file I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for I/O operations.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// Errors raised while reading or writing image files.
#[derive(Debug, Error)]
pub enum IoError {
    /// The file could not be decoded as a supported PNG.
    #[error("failed to decode {path}: {reason}")]
    Decode {
        /// File that failed to decode.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// The file could not be encoded.
    #[error("failed to encode {path}: {reason}")]
    Encode {
        /// File that failed to encode.
        path: PathBuf,
        /// Encoder message.
        reason: String,
    },

    /// The PNG uses a color type or bit depth the pipeline does not handle.
    #[error("unsupported PNG format in {path}: {format}")]
    UnsupportedFormat {
        /// Offending file.
        path: PathBuf,
        /// Color type / bit depth description.
        format: String,
    },

    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid buffer produced while normalizing pixel data.
    #[error(transparent)]
    Core(#[from] plx_core::Error),
}
