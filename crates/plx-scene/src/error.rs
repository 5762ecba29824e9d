//! Error types for scene construction and export.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scene operations.
pub type SceneResult<T> = std::result::Result<T, SceneError>;

/// Errors raised while building, exporting or rendering a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A referenced texture file does not exist.
    ///
    /// Raised before any output is written; a partial scene never lands on
    /// disk.
    #[error("texture file not found: {0}")]
    MissingTexture(PathBuf),

    /// Displacement was requested but a card has no depth texture.
    #[error("depth texture not found: {0}")]
    MissingDepthTexture(PathBuf),

    /// Inconsistent inputs (empty card list, mismatched lengths or layer
    /// dimensions).
    #[error("invalid scene input: {0}")]
    InvalidInput(String),

    /// Image file error.
    #[error(transparent)]
    Io(#[from] plx_io::IoError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    File(#[from] std::io::Error),

    /// glTF JSON serialization error.
    #[error("glTF serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Error bubbled up from a core buffer operation.
    #[error(transparent)]
    Core(#[from] plx_core::Error),
}
