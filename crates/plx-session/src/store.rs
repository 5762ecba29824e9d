//! Session persistence.
//!
//! There is no process-wide session registry: whoever orchestrates edits
//! owns a [`SessionStore`] and passes sessions by value or reference. The
//! filesystem store keeps one directory per session containing a
//! `session.json` manifest plus the source image, the depth map and every
//! layer revision as PNG files. Layer identities inside the manifest are
//! relative to the session directory.

use crate::history::RevisionLog;
use crate::layer::Layer;
use crate::session::Session;
use crate::{SessionError, SessionResult};
use plx_io::Compression;
use plx_ops::threshold::ThresholdSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Manifest file name inside a session directory.
pub const MANIFEST_FILE: &str = "session.json";
/// Source image file name.
pub const SOURCE_FILE: &str = "source.png";
/// Depth map file name.
pub const DEPTH_MAP_FILE: &str = "depth_map.png";

/// Loads and saves sessions.
///
/// Injected wherever persistence is needed so orchestration code never
/// hardcodes a storage layout.
pub trait SessionStore {
    /// Persists a session into `dir`.
    fn save(&self, session: &Session, dir: &Path) -> SessionResult<()>;
    /// Restores a session from `dir`.
    fn load(&self, dir: &Path) -> SessionResult<Session>;
}

/// One-directory-per-session filesystem store.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSessionStore;

#[derive(Serialize, Deserialize)]
struct Manifest {
    version: u32,
    num_layers: usize,
    matte_expand: usize,
    thresholds: Option<Vec<u8>>,
    source: Option<String>,
    depth_map: Option<String>,
    layers: Vec<LayerEntry>,
}

#[derive(Serialize, Deserialize)]
struct LayerEntry {
    depth: u8,
    revisions: Vec<String>,
    cursor: usize,
}

impl SessionStore for FsSessionStore {
    fn save(&self, session: &Session, dir: &Path) -> SessionResult<()> {
        std::fs::create_dir_all(dir)?;

        if let Some(source) = &session.source {
            plx_io::write_rgba(dir.join(SOURCE_FILE), source, Compression::Default)?;
        }
        if let Some(depth_map) = &session.depth_map {
            plx_io::write_gray(dir.join(DEPTH_MAP_FILE), depth_map, Compression::Fast)?;
        }
        for layer in session.layers() {
            plx_io::write_rgba(dir.join(layer.file()), &layer.image, Compression::Default)?;
            debug!(file = %layer.file().display(), "layer saved");
        }

        let manifest = Manifest {
            version: 1,
            num_layers: session.band_count(),
            matte_expand: session.matte_expand,
            thresholds: session.thresholds().map(|t| t.boundaries().to_vec()),
            source: session.source.as_ref().map(|_| SOURCE_FILE.to_string()),
            depth_map: session.depth_map.as_ref().map(|_| DEPTH_MAP_FILE.to_string()),
            layers: session
                .layers()
                .iter()
                .map(|layer| LayerEntry {
                    depth: layer.depth,
                    revisions: layer
                        .revisions()
                        .entries()
                        .iter()
                        .map(|p| p.to_string_lossy().into_owned())
                        .collect(),
                    cursor: layer.revisions().cursor(),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(dir.join(MANIFEST_FILE), json)?;
        info!(dir = %dir.display(), layers = session.layer_count(), "session saved");
        Ok(())
    }

    fn load(&self, dir: &Path) -> SessionResult<Session> {
        let json = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest: Manifest = serde_json::from_str(&json)?;
        if manifest.version != 1 {
            return Err(SessionError::Manifest(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        let mut session = Session::new();
        session.matte_expand = manifest.matte_expand;
        if manifest.num_layers >= 2 {
            session.set_band_count(manifest.num_layers);
        }
        // The stored thresholds win over the recomputed ones.
        if let Some(bounds) = manifest.thresholds {
            let set = ThresholdSet::from_boundaries(bounds)
                .map_err(|e| SessionError::Manifest(e.to_string()))?;
            session.restore_thresholds(set);
        } else {
            session.clear_thresholds();
        }

        if let Some(name) = &manifest.source {
            session.source = Some(plx_io::read_rgba(dir.join(name))?);
        }
        if let Some(name) = &manifest.depth_map {
            session.depth_map = Some(plx_io::read_gray(dir.join(name))?);
        }

        for (i, entry) in manifest.layers.iter().enumerate() {
            let revisions = RevisionLog::from_parts(
                entry.revisions.iter().map(PathBuf::from).collect(),
                entry.cursor,
            )
            .ok_or_else(|| SessionError::Manifest(format!("layer {i}: bad revision log")))?;
            let image = plx_io::read_rgba(dir.join(revisions.current()))?;
            session.restore_layer(Layer::with_revisions(image, entry.depth, revisions));
        }
        info!(dir = %dir.display(), layers = session.layer_count(), "session loaded");
        Ok(session)
    }
}
