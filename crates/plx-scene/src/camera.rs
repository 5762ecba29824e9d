//! Pinhole camera intrinsics and depth-to-distance mapping.
//!
//! Focal lengths are given in millimetres against a 35 mm full-frame sensor
//! reference; the intrinsic matrix converts that to pixels for the layer's
//! resolution. The principal point sits at the image centre and pixels are
//! square (`fx == fy`).

use glam::{Mat3, Vec3};

/// Reference sensor width in millimetres for focal-length conversion.
pub const SENSOR_WIDTH_MM: f32 = 35.0;

/// Camera placement parameters for card layout.
///
/// `camera_distance` is the distance from the camera to the nearest card,
/// `max_distance` to the farthest. Layer depths map linearly between the
/// two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    /// Focal length in millimetres (35 mm equivalent).
    pub focal_length: f32,
    /// Distance from the camera to the nearest card.
    pub camera_distance: f32,
    /// Distance from the camera to the farthest card.
    pub max_distance: f32,
}

impl CameraParams {
    /// Creates camera parameters.
    pub fn new(focal_length: f32, camera_distance: f32, max_distance: f32) -> Self {
        Self {
            focal_length,
            camera_distance,
            max_distance,
        }
    }
}

impl Default for CameraParams {
    /// The dolly-animation defaults: 100 mm lens, cards between 100 and 500
    /// scene units.
    fn default() -> Self {
        Self {
            focal_length: 100.0,
            camera_distance: 100.0,
            max_distance: 500.0,
        }
    }
}

/// Builds the 3x3 intrinsic matrix for an image of `width` x `height`.
///
/// ```text
/// | fx  0  cx |
/// |  0 fy  cy |
/// |  0  0   1 |
/// ```
///
/// with `fx = fy = width * focal_length / 35` and `(cx, cy)` at the image
/// centre. Stored column-major (glam convention); use [`Mat3::col`] or the
/// accessors below.
pub fn intrinsic_matrix(width: u32, height: u32, focal_length: f32) -> Mat3 {
    let fx = width as f32 * focal_length / SENSOR_WIDTH_MM;
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    Mat3::from_cols(
        Vec3::new(fx, 0.0, 0.0),
        Vec3::new(0.0, fx, 0.0),
        Vec3::new(cx, cy, 1.0),
    )
}

/// Focal length in pixels of an intrinsic matrix.
#[inline]
pub fn focal_px(camera: &Mat3) -> f32 {
    camera.x_axis.x
}

/// Principal point of an intrinsic matrix.
#[inline]
pub fn principal_point(camera: &Mat3) -> (f32, f32) {
    (camera.z_axis.x, camera.z_axis.y)
}

/// Output framing ratio of an intrinsic matrix: `cx / cy`.
///
/// Equals the image aspect ratio for a centred principal point.
#[inline]
pub fn aspect_ratio(camera: &Mat3) -> f32 {
    camera.z_axis.x / camera.z_axis.y
}

/// Maps a layer depth onto a camera-space distance.
///
/// `depth` in `[min_depth, max_depth]` maps linearly onto
/// `[camera_distance, max_distance]`. When every layer shares one depth
/// (`min_depth == max_depth`) all cards sit at `camera_distance`; the
/// degenerate range is a fallback, never a division by zero.
pub fn depth_to_distance(depth: u8, min_depth: u8, max_depth: u8, params: &CameraParams) -> f32 {
    if min_depth == max_depth {
        return params.camera_distance;
    }
    let t = (depth - min_depth) as f32 / (max_depth - min_depth) as f32;
    params.camera_distance + t * (params.max_distance - params.camera_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn intrinsics_match_hand_computation() {
        let m = intrinsic_matrix(100, 100, 50.0);
        assert_relative_eq!(focal_px(&m), 100.0 * 50.0 / 35.0);
        let (cx, cy) = principal_point(&m);
        assert_relative_eq!(cx, 50.0);
        assert_relative_eq!(cy, 50.0);
        assert_relative_eq!(aspect_ratio(&m), 1.0);
    }

    #[test]
    fn aspect_follows_image_shape() {
        let m = intrinsic_matrix(200, 100, 50.0);
        assert_relative_eq!(aspect_ratio(&m), 2.0);
    }

    #[test]
    fn depth_maps_linearly() {
        let params = CameraParams::new(50.0, 10.0, 100.0);
        assert_relative_eq!(depth_to_distance(0, 0, 255, &params), 10.0);
        assert_relative_eq!(depth_to_distance(255, 0, 255, &params), 100.0);
        let mid = depth_to_distance(128, 0, 255, &params);
        assert!(mid > 54.0 && mid < 56.0);
    }

    #[test]
    fn degenerate_range_falls_back_to_near_plane() {
        let params = CameraParams::new(50.0, 10.0, 100.0);
        assert_relative_eq!(depth_to_distance(77, 77, 77, &params), 10.0);
    }
}
