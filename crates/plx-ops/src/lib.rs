//! # plx-ops
//!
//! Pixel operations for depth-layered scene decomposition.
//!
//! This crate turns a photograph plus a depth map into a stack of
//! alpha-matted cutout layers, and provides the supporting raster operations
//! the rest of the pipeline needs.
//!
//! # Modules
//!
//! - [`threshold`] - depth-histogram cut-point selection and repair
//! - [`matte`] - slice/matte generation from bands and free-form masks
//! - [`composite`] - alpha blending and stack flattening
//! - [`filter`] - box blur
//! - [`morph`] - 3x3 erosion and dilation
//! - [`clean`] - depth-map cleanup for displacement export
//!
//! # Example
//!
//! ```rust
//! use plx_core::{GrayImage, RgbaImage};
//! use plx_ops::threshold::ThresholdSet;
//! use plx_ops::matte::generate_layers;
//!
//! let image = RgbaImage::filled(16, 16, [128, 128, 128, 255]);
//! let depth = GrayImage::filled(16, 16, 40);
//! let thresholds = ThresholdSet::even(2);
//! let (layers, depths) = generate_layers(&image, &depth, &thresholds, 0).unwrap();
//! assert_eq!(layers.len(), 2);
//! assert_eq!(depths[0], 40);
//! ```

#![warn(missing_docs)]

mod error;
pub mod clean;
pub mod composite;
pub mod filter;
pub mod matte;
pub mod morph;
pub mod threshold;

pub use error::{OpsError, OpsResult};
pub use threshold::ThresholdSet;
