//! # plx-io
//!
//! PNG file I/O for the layer pipeline.
//!
//! Every persisted raster in the system is a PNG: source photos, layer
//! cutouts (RGBA), depth side files (grayscale) and rendered animation
//! frames. Reads normalize to the two in-memory buffer types; writes can
//! trade compression ratio for speed when dumping many depth textures.
//!
//! # Example
//!
//! ```rust,no_run
//! use plx_io::{read_rgba, write_rgba, Compression};
//!
//! let layer = read_rgba("slice_0.png")?;
//! write_rgba("slice_0_copy.png", &layer, Compression::Fast)?;
//! # Ok::<(), plx_io::IoError>(())
//! ```

#![warn(missing_docs)]

mod error;
mod png_file;

pub use error::{IoError, IoResult};
pub use png_file::{read_gray, read_rgba, write_gray, write_rgba, Compression};
