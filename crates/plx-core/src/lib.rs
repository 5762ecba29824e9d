//! # plx-core
//!
//! Core types shared by the parallax scene pipeline.
//!
//! A *layer* (or slice) is an RGBA cutout of the source photograph covering
//! one depth band; a *depth map* is a single-channel 8-bit image aligned with
//! the source. This crate provides the buffer types for both, the fixed depth
//! ordering convention, and the [`DepthEstimator`] trait that marks the
//! boundary to the external depth-estimation model.
//!
//! # Modules
//!
//! - [`image`] - [`RgbaImage`] and [`GrayImage`] buffers
//! - [`depth`] - the [`DepthMap`] alias and ordering convention
//! - [`estimator`] - the depth-estimation collaborator boundary
//! - [`error`] - shared error type

#![warn(missing_docs)]

mod error;
pub mod depth;
pub mod estimator;
pub mod image;

pub use depth::DepthMap;
pub use error::{Error, Result};
pub use estimator::DepthEstimator;
pub use image::{GrayImage, RgbaImage};
