//! Depth map alias and the pipeline-wide depth ordering convention.

use crate::image::GrayImage;

/// Single-channel 8-bit depth map, same dimensions as the source image.
///
/// Samples follow [`LARGER_IS_FARTHER`]: 0 is the nearest representable
/// depth, 255 the farthest.
pub type DepthMap = GrayImage;

/// Fixed depth convention for the whole pipeline.
///
/// A larger depth sample lies farther from the camera. Consequently a layer
/// list sorted by ascending depth puts the nearest layer at index 0, and
/// back-to-front compositing iterates the list in descending index order.
/// Every module reads this constant instead of re-deriving the convention.
pub const LARGER_IS_FARTHER: bool = true;

/// Midpoint of the representable depth range.
///
/// Used as the representative depth for layers created without any depth
/// information (an empty band, or a blank slice added by hand).
pub const MID_DEPTH: u8 = 127;
