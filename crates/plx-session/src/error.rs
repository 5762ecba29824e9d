//! Error types for session operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Errors raised by session editing, persistence and orchestration.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A layer index was out of range.
    ///
    /// Raised before any mutation; the session is untouched.
    #[error("layer index {index} out of range (have {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current layer count.
        len: usize,
    },

    /// An operation needed a depth map the session does not have.
    #[error("no depth map in session")]
    MissingDepthMap,

    /// An operation needed a source image the session does not have.
    #[error("no source image in session")]
    MissingSource,

    /// A threshold adjustment arrived before any thresholds exist.
    #[error("no thresholds in session")]
    MissingThresholds,

    /// Displacement export found no depth side file and no estimator.
    #[error("depth texture {0} missing and no depth estimator supplied")]
    EstimatorRequired(PathBuf),

    /// The session manifest was malformed.
    #[error("invalid session manifest: {0}")]
    Manifest(String),

    /// Pixel operation error.
    #[error(transparent)]
    Ops(#[from] plx_ops::OpsError),

    /// Scene construction or export error.
    #[error(transparent)]
    Scene(#[from] plx_scene::SceneError),

    /// Image file error.
    #[error(transparent)]
    Io(#[from] plx_io::IoError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    File(#[from] std::io::Error),

    /// Manifest (de)serialization error.
    #[error("manifest serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Core buffer error.
    #[error(transparent)]
    Core(#[from] plx_core::Error),
}
