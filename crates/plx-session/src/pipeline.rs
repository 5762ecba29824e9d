//! Export and animation orchestration.
//!
//! Bridges the session to the scene crate: picks the visible layers,
//! resolves texture and depth side files on disk, generates and cleans
//! per-layer depth maps when displacement is requested, and hands explicit
//! card geometry to the exporter or renderer.

use crate::naming::{depth_filename, upscaled_filename};
use crate::session::Session;
use crate::{SessionError, SessionResult};
use glam::Vec3;
use plx_core::{DepthEstimator, RgbaImage};
use plx_io::Compression;
use plx_ops::clean::{clean_depth, CleanDepthOptions};
use plx_scene::camera::{self, CameraParams};
use plx_scene::{gltf, render, setup_camera_and_cards};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Scene file name inside a session directory.
pub const MODEL_FILE: &str = "model.gltf";

/// Options for [`export_gltf`].
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Camera placement for card layout.
    pub camera: CameraParams,
    /// Vertex displacement scale; zero exports flat quads.
    pub displacement_scale: f32,
    /// Record the focus distance on the exported camera.
    pub support_depth_of_field: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            camera: CameraParams::new(50.0, 10.0, 100.0),
            displacement_scale: 0.0,
            support_depth_of_field: false,
        }
    }
}

/// Options for [`render_animation`].
#[derive(Debug, Clone, Copy)]
pub struct AnimationOptions {
    /// Camera placement for card layout.
    pub camera: CameraParams,
    /// Camera start position.
    pub start_position: Vec3,
    /// Distance the camera pushes toward the scene.
    pub push_distance: f32,
    /// Number of frames to render.
    pub num_frames: usize,
}

impl Default for AnimationOptions {
    /// The dolly preview defaults: camera pulled back 100 units, pushing
    /// its own near distance over 25 frames.
    fn default() -> Self {
        Self {
            camera: CameraParams::default(),
            start_position: Vec3::new(0.0, 0.0, -100.0),
            push_distance: 100.0,
            num_frames: 25,
        }
    }
}

/// Indices of layers that contribute pixels.
fn visible_layers(session: &Session) -> Vec<usize> {
    session
        .layers()
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.image.is_fully_transparent())
        .map(|(i, _)| i)
        .collect()
}

/// Exports the session as a glTF scene in `dir`.
///
/// Fully transparent layers are skipped. Each remaining layer's texture is
/// its current revision file, or the `_upscaled` variant when one exists on
/// disk - resolved on every call, never cached. With a positive
/// `displacement_scale` each layer needs a `_depth` side file; existing
/// files are reused, otherwise `estimator` produces a raw map that is
/// cleaned against the layer's matte and written next to the texture.
/// A zero `displacement_scale` never touches depth maps or the estimator.
///
/// Returns the written scene path.
///
/// # Errors
///
/// - [`SessionError::EstimatorRequired`] when displacement needs a depth
///   map, none exists and no estimator was supplied
/// - exporter errors (missing textures) propagate unchanged
pub fn export_gltf(
    session: &Session,
    dir: &Path,
    opts: &ExportOptions,
    estimator: Option<&dyn DepthEstimator>,
) -> SessionResult<PathBuf> {
    let visible = visible_layers(session);
    if visible.len() < session.layer_count() {
        info!(
            skipped = session.layer_count() - visible.len(),
            "skipping fully transparent layers"
        );
    }
    let output_path = dir.join(MODEL_FILE);

    if visible.is_empty() {
        warn!("no visible layers; exporting camera-only scene");
        let aspect = empty_scene_aspect(session);
        let path = gltf::export_scene(
            &output_path,
            aspect,
            opts.camera.focal_length,
            opts.camera.camera_distance,
            &[],
            &[],
            &[],
            0.0,
            opts.support_depth_of_field,
        )?;
        return Ok(path);
    }

    let images: Vec<RgbaImage> = visible
        .iter()
        .map(|&i| session.layers()[i].image.clone())
        .collect();
    let depths: Vec<u8> = visible.iter().map(|&i| session.layers()[i].depth).collect();
    let (matrix, cards) = setup_camera_and_cards(&images, &depths, &opts.camera)?;

    let mut texture_paths = Vec::with_capacity(visible.len());
    let mut depth_paths = Vec::new();
    for (&index, image) in visible.iter().zip(&images) {
        let layer_file = dir.join(session.layers()[index].file());

        let upscaled = upscaled_filename(&layer_file);
        if upscaled.is_file() {
            debug!(file = %upscaled.display(), "using upscaled texture");
            texture_paths.push(upscaled);
        } else {
            texture_paths.push(layer_file.clone());
        }

        if opts.displacement_scale > 0.0 {
            let depth_file = depth_filename(&layer_file);
            if !depth_file.is_file() {
                let Some(est) = estimator else {
                    return Err(SessionError::EstimatorRequired(depth_file));
                };
                debug!(file = %depth_file.display(), "estimating layer depth");
                let raw = est.estimate(image)?;
                let cleaned = clean_depth(&raw, &image.alpha_plane(), &CleanDepthOptions::default())?;
                plx_io::write_gray(&depth_file, &cleaned, Compression::Fast)?;
            }
            depth_paths.push(depth_file);
        }
    }

    let aspect = camera::aspect_ratio(&matrix);
    let path = gltf::export_scene(
        &output_path,
        aspect,
        opts.camera.focal_length,
        opts.camera.camera_distance,
        &cards,
        &texture_paths,
        &depth_paths,
        opts.displacement_scale,
        opts.support_depth_of_field,
    )?;
    Ok(path)
}

/// Renders the dolly preview animation into `output_dir`.
///
/// Returns the frame paths in order; an empty session yields an empty list
/// without touching the filesystem.
pub fn render_animation(
    session: &Session,
    output_dir: &Path,
    opts: &AnimationOptions,
) -> SessionResult<Vec<PathBuf>> {
    let visible = visible_layers(session);
    if visible.is_empty() {
        info!("no visible layers; nothing to render");
        return Ok(Vec::new());
    }
    let images: Vec<RgbaImage> = visible
        .iter()
        .map(|&i| session.layers()[i].image.clone())
        .collect();
    let depths: Vec<u8> = visible.iter().map(|&i| session.layers()[i].depth).collect();
    let (matrix, cards) = setup_camera_and_cards(&images, &depths, &opts.camera)?;

    let frames = render::render_sequence(
        output_dir,
        &images,
        &cards,
        &matrix,
        opts.start_position,
        opts.push_distance,
        opts.num_frames,
    )?;
    Ok(frames)
}

/// Framing for a scene with no cards, taken from whatever image is at hand.
fn empty_scene_aspect(session: &Session) -> f32 {
    let dims = session
        .layers()
        .first()
        .map(|l| l.image.dimensions())
        .or_else(|| session.source.as_ref().map(|s| s.dimensions()));
    match dims {
        Some((w, h)) if h > 0 => w as f32 / h as f32,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FsSessionStore, SessionStore};
    use plx_core::{DepthMap, GrayImage, Result as CoreResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Estimator double that counts invocations.
    struct CountingEstimator {
        calls: AtomicUsize,
        value: u8,
    }

    impl CountingEstimator {
        fn new(value: u8) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                value,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DepthEstimator for CountingEstimator {
        fn estimate(&self, image: &RgbaImage) -> CoreResult<DepthMap> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GrayImage::filled(image.width(), image.height(), self.value))
        }
    }

    fn sliced_session() -> Session {
        let mut s = Session::new();
        s.set_source(RgbaImage::filled(32, 24, [120, 110, 100, 255]));
        let mut depth = GrayImage::new(32, 24);
        for y in 0..24 {
            for x in 16..32 {
                depth.set_sample(x, y, 230);
            }
        }
        s.set_depth_map(depth);
        s.set_band_count(2);
        s.matte_expand = 0;
        s.generate_slices().unwrap();
        s
    }

    fn saved_session(dir: &Path) -> Session {
        let session = sliced_session();
        FsSessionStore.save(&session, dir).unwrap();
        session
    }

    #[test]
    fn flat_export_never_calls_estimator() {
        let dir = tempfile::tempdir().unwrap();
        let session = saved_session(dir.path());
        let estimator = CountingEstimator::new(50);
        let path = export_gltf(
            &session,
            dir.path(),
            &ExportOptions::default(),
            Some(&estimator),
        )
        .unwrap();
        assert!(path.ends_with(MODEL_FILE));
        assert!(path.is_file());
        assert_eq!(estimator.calls(), 0);
        // No depth side files appeared either.
        assert!(!dir.path().join("slice_0_depth.png").exists());
    }

    #[test]
    fn displacement_estimates_once_per_layer_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let session = saved_session(dir.path());
        let estimator = CountingEstimator::new(80);
        let opts = ExportOptions {
            displacement_scale: 1.0,
            ..ExportOptions::default()
        };
        export_gltf(&session, dir.path(), &opts, Some(&estimator)).unwrap();
        assert_eq!(estimator.calls(), 2);
        assert!(dir.path().join("slice_0_depth.png").is_file());
        assert!(dir.path().join("slice_1_depth.png").is_file());

        // Re-export reuses the files on disk.
        export_gltf(&session, dir.path(), &opts, Some(&estimator)).unwrap();
        assert_eq!(estimator.calls(), 2);
    }

    #[test]
    fn displacement_without_estimator_or_files_fails() {
        let dir = tempfile::tempdir().unwrap();
        let session = saved_session(dir.path());
        let opts = ExportOptions {
            displacement_scale: 1.0,
            ..ExportOptions::default()
        };
        let err = export_gltf(&session, dir.path(), &opts, None).unwrap_err();
        assert!(matches!(err, SessionError::EstimatorRequired(_)));
        assert!(!dir.path().join(MODEL_FILE).exists());
    }

    #[test]
    fn upscaled_texture_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let session = saved_session(dir.path());
        let upscaled = RgbaImage::filled(64, 48, [1, 1, 1, 255]);
        plx_io::write_rgba(
            dir.path().join("slice_0_upscaled.png"),
            &upscaled,
            Compression::Fast,
        )
        .unwrap();

        let path = export_gltf(&session, dir.path(), &ExportOptions::default(), None).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let uris: Vec<&str> = doc["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["uri"].as_str().unwrap())
            .collect();
        assert!(uris.contains(&"slice_0_upscaled.png"));
        assert!(uris.contains(&"slice_1.png"));
    }

    #[test]
    fn transparent_layers_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = saved_session(dir.path());
        session.add_layer(RgbaImage::new(32, 24), 140);
        FsSessionStore.save(&session, dir.path()).unwrap();

        let path = export_gltf(&session, dir.path(), &ExportOptions::default(), None).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["meshes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn empty_session_exports_camera_only_scene() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new();
        let path = export_gltf(&session, dir.path(), &ExportOptions::default(), None).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(doc.get("meshes").is_none());
    }

    #[test]
    fn animation_renders_requested_frames() {
        let dir = tempfile::tempdir().unwrap();
        let session = sliced_session();
        let opts = AnimationOptions {
            num_frames: 3,
            ..AnimationOptions::default()
        };
        let frames = render_animation(&session, &dir.path().join("frames"), &opts).unwrap();
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert!(frame.is_file());
        }
    }

    #[test]
    fn animation_of_empty_session_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let frames =
            render_animation(&Session::new(), dir.path(), &AnimationOptions::default()).unwrap();
        assert!(frames.is_empty());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
