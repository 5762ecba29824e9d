//! Card geometry: one planar quad per layer.
//!
//! A card fills the camera frustum exactly at its distance, so every card
//! projects onto the full frame and the stack reproduces the original 2D
//! composition from the reference viewpoint - the classic dolly-zoom-
//! consistent sizing where a farther card is proportionally larger.

use crate::camera::{self, CameraParams};
use crate::{SceneError, SceneResult};
use glam::{Mat3, Vec3};
use plx_core::RgbaImage;
use tracing::debug;

/// A layer's planar quad in camera space.
///
/// Corner order is top-left, top-right, bottom-left, bottom-right in the
/// pipeline convention (x right, y down, z forward); all four share one z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Card {
    /// Quad corners: TL, TR, BL, BR.
    pub corners: [Vec3; 4],
    /// Pixel dimensions of the layer texture mapped onto this card.
    pub pixel_size: (u32, u32),
}

impl Card {
    /// Distance from the camera along the view axis.
    #[inline]
    pub fn distance(&self) -> f32 {
        self.corners[0].z
    }

    /// Physical card width.
    #[inline]
    pub fn width(&self) -> f32 {
        self.corners[1].x - self.corners[0].x
    }

    /// Physical card height.
    #[inline]
    pub fn height(&self) -> f32 {
        self.corners[2].y - self.corners[0].y
    }

    /// Card centre point.
    pub fn center(&self) -> Vec3 {
        (self.corners[0] + self.corners[1] + self.corners[2] + self.corners[3]) / 4.0
    }
}

/// Derives the camera intrinsics and one card per layer.
///
/// Layer depths map linearly onto `[camera_distance, max_distance]`; each
/// card is sized to exactly fill the field of view at its distance
/// (`width = image_width * z / fx`). Returns explicit corner coordinates
/// because the exporter needs vertices, not centre+extent.
///
/// # Errors
///
/// Returns [`SceneError::InvalidInput`] for an empty layer list, mismatched
/// `layers`/`depths` lengths, or layers of differing dimensions. Callers
/// with nothing to place skip the call instead.
pub fn setup_camera_and_cards(
    layers: &[RgbaImage],
    depths: &[u8],
    params: &CameraParams,
) -> SceneResult<(Mat3, Vec<Card>)> {
    let first = layers
        .first()
        .ok_or_else(|| SceneError::InvalidInput("no layers to place".into()))?;
    if layers.len() != depths.len() {
        return Err(SceneError::InvalidInput(format!(
            "{} layers but {} depths",
            layers.len(),
            depths.len()
        )));
    }
    let (width, height) = first.dimensions();
    for layer in layers {
        if layer.dimensions() != (width, height) {
            return Err(SceneError::InvalidInput(format!(
                "layer dimensions {:?} differ from {:?}",
                layer.dimensions(),
                (width, height)
            )));
        }
    }

    let matrix = camera::intrinsic_matrix(width, height, params.focal_length);
    let fx = camera::focal_px(&matrix);
    let (min_depth, max_depth) = depths
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &d| (lo.min(d), hi.max(d)));

    let mut cards = Vec::with_capacity(layers.len());
    for &depth in depths {
        let z = camera::depth_to_distance(depth, min_depth, max_depth, params);
        let half_w = width as f32 * z / fx / 2.0;
        let half_h = height as f32 * z / fx / 2.0;
        cards.push(Card {
            corners: [
                Vec3::new(-half_w, -half_h, z),
                Vec3::new(half_w, -half_h, z),
                Vec3::new(-half_w, half_h, z),
                Vec3::new(half_w, half_h, z),
            ],
            pixel_size: (width, height),
        });
    }
    debug!(
        cards = cards.len(),
        min_depth, max_depth, "camera and cards set up"
    );
    Ok((matrix, cards))
}
