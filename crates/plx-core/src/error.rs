//! Error types shared across the pipeline crates.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by buffer operations and the estimator boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel coordinates are outside the buffer bounds.
    #[error("pixel ({x}, {y}) out of bounds for image {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was accessed.
        x: u32,
        /// Y coordinate that was accessed.
        y: u32,
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },

    /// Two buffers that must share dimensions do not.
    ///
    /// Raised before any partial mutation occurs; the inputs are untouched.
    #[error("dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// First buffer width.
        a_width: u32,
        /// First buffer height.
        a_height: u32,
        /// Second buffer width.
        b_width: u32,
        /// Second buffer height.
        b_height: u32,
    },

    /// A buffer was constructed with inconsistent dimensions or data length.
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Why the dimensions are invalid.
        reason: String,
    },

    /// The external depth-estimation collaborator failed.
    #[error("depth estimation failed: {0}")]
    Estimator(String),

    /// I/O error from file-backed operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates an [`Error::OutOfBounds`].
    #[inline]
    pub fn out_of_bounds(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::DimensionMismatch`] from two `(width, height)` pairs.
    #[inline]
    pub fn dimension_mismatch(a: (u32, u32), b: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            a_width: a.0,
            a_height: a.1,
            b_width: b.0,
            b_height: b.1,
        }
    }

    /// Creates an [`Error::InvalidDimensions`].
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_message() {
        let err = Error::out_of_bounds(120, 40, 100, 60);
        let msg = err.to_string();
        assert!(msg.contains("120"));
        assert!(msg.contains("100x60"));
    }

    #[test]
    fn mismatch_message() {
        let err = Error::dimension_mismatch((10, 20), (30, 40));
        assert!(err.to_string().contains("10x20"));
        assert!(err.to_string().contains("30x40"));
    }

    #[test]
    fn io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
