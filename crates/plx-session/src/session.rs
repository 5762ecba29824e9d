//! The editing session: a depth-ordered layer stack and its operations.

use crate::layer::Layer;
use crate::naming::filename_add_version;
use crate::{SessionError, SessionResult};
use plx_core::{depth::MID_DEPTH, DepthMap, RgbaImage};
use plx_ops::matte::generate_layers;
use plx_ops::threshold::ThresholdSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default matte expansion in pixels when slicing.
pub const DEFAULT_MATTE_EXPAND: usize = 5;

/// Default number of depth bands for a fresh session.
pub const DEFAULT_LAYER_COUNT: usize = 5;

/// Outcome of a threshold or layer-count update.
///
/// `Unchanged` is the cheap idempotence signal: the effective inputs were
/// already in place and callers must skip re-slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdOutcome {
    /// Thresholds changed; downstream slices are stale.
    Updated,
    /// Nothing changed; skip downstream work.
    Unchanged,
}

/// An editing session over one source photograph.
///
/// Layers are kept sorted by ascending depth: index 0 is nearest to the
/// camera. Not safe for concurrent mutation; one session has one writer.
#[derive(Debug, Clone)]
pub struct Session {
    layers: Vec<Layer>,
    /// Source photograph, if one has been loaded.
    pub source: Option<RgbaImage>,
    /// Estimated depth map for the source.
    pub depth_map: Option<DepthMap>,
    thresholds: Option<ThresholdSet>,
    num_layers: usize,
    /// Matte expansion in pixels applied when slicing.
    pub matte_expand: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session with default slicing parameters.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            source: None,
            depth_map: None,
            thresholds: None,
            num_layers: DEFAULT_LAYER_COUNT,
            matte_expand: DEFAULT_MATTE_EXPAND,
        }
    }

    /// The layer stack, nearest first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// A single layer by index.
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Mutable access to a layer's pixels for an edit in progress.
    ///
    /// Callers record a revision afterwards; the session stays single-writer.
    pub fn layer_image_mut(&mut self, index: usize) -> SessionResult<&mut RgbaImage> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .map(|l| &mut l.image)
            .ok_or(SessionError::IndexOutOfRange { index, len })
    }

    /// Number of layers in the stack.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Configured number of depth bands for slicing.
    pub fn band_count(&self) -> usize {
        self.num_layers
    }

    /// Current thresholds, if any.
    pub fn thresholds(&self) -> Option<&ThresholdSet> {
        self.thresholds.as_ref()
    }

    /// Replaces the source photograph, invalidating derived state.
    pub fn set_source(&mut self, image: RgbaImage) {
        self.source = Some(image);
        self.depth_map = None;
        self.thresholds = None;
    }

    /// Replaces the depth map, invalidating the thresholds.
    ///
    /// The depth map is owned wholesale; regeneration swaps the entire
    /// buffer.
    pub fn set_depth_map(&mut self, map: DepthMap) {
        self.depth_map = Some(map);
        self.thresholds = None;
    }

    /// Sets the band count, recomputing thresholds when needed.
    ///
    /// With an unchanged count and a matching threshold set this is the
    /// no-op case and nothing is recomputed. Otherwise thresholds come from
    /// the depth histogram when a depth map exists, or even spacing when
    /// not.
    ///
    /// # Panics
    ///
    /// Panics if `num_layers < 2` (propagated from threshold selection);
    /// a band count below two is a programming error.
    pub fn set_band_count(&mut self, num_layers: usize) -> ThresholdOutcome {
        if num_layers == self.num_layers
            && self
                .thresholds
                .as_ref()
                .is_some_and(|t| t.bands() == num_layers)
        {
            debug!(num_layers, "band count unchanged");
            return ThresholdOutcome::Unchanged;
        }
        self.num_layers = num_layers;
        self.thresholds = Some(match &self.depth_map {
            Some(map) => ThresholdSet::from_histogram(map, num_layers),
            None => ThresholdSet::even(num_layers),
        });
        ThresholdOutcome::Updated
    }

    /// Repairs and applies user-proposed interior thresholds.
    ///
    /// Returns [`ThresholdOutcome::Unchanged`] when the repaired proposal
    /// equals the stored thresholds, so callers skip re-slicing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingThresholds`] if no thresholds exist
    /// yet (nothing to adjust against).
    pub fn apply_thresholds(&mut self, proposed: &[u8]) -> SessionResult<ThresholdOutcome> {
        let current = self
            .thresholds
            .as_ref()
            .ok_or(SessionError::MissingThresholds)?;
        match current.adjust(proposed) {
            Some(repaired) => {
                self.thresholds = Some(repaired);
                Ok(ThresholdOutcome::Updated)
            }
            None => {
                debug!("thresholds unchanged");
                Ok(ThresholdOutcome::Unchanged)
            }
        }
    }

    /// Slices the source into fresh layers from the depth map.
    ///
    /// Replaces the whole stack: new `slice_N.png` identities, reset
    /// histories. Thresholds are computed on demand if absent. Returns the
    /// number of layers produced.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSource`] / [`SessionError::MissingDepthMap`]
    /// when the inputs are absent.
    pub fn generate_slices(&mut self) -> SessionResult<usize> {
        let source = self.source.as_ref().ok_or(SessionError::MissingSource)?;
        let depth_map = self.depth_map.as_ref().ok_or(SessionError::MissingDepthMap)?;
        let thresholds = match &self.thresholds {
            Some(t) => t.clone(),
            None => {
                let t = ThresholdSet::from_histogram(depth_map, self.num_layers);
                self.thresholds = Some(t.clone());
                t
            }
        };

        let (images, depths) = generate_layers(source, depth_map, &thresholds, self.matte_expand)?;
        self.layers = images
            .into_iter()
            .zip(depths)
            .enumerate()
            .map(|(i, (image, depth))| {
                Layer::new(image, depth, PathBuf::from(format!("slice_{i}.png")))
            })
            .collect();
        self.layers.sort_by_key(|l| l.depth);
        info!(layers = self.layers.len(), "slices generated");
        Ok(self.layers.len())
    }

    /// Inserts a layer, keeping the stack sorted by ascending depth.
    ///
    /// Equal depths insert after existing layers (stable). Returns the
    /// insertion index.
    pub fn add_layer(&mut self, image: RgbaImage, depth: u8) -> usize {
        let file = self.unused_slice_name();
        let index = self.layers.partition_point(|l| l.depth <= depth);
        self.layers.insert(index, Layer::new(image, depth, file));
        debug!(index, depth, "layer added");
        index
    }

    /// Removes a layer, shifting subsequent indices down.
    ///
    /// The layer's revision files stay on disk; history never deletes them.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IndexOutOfRange`] for a bad index.
    pub fn delete_layer(&mut self, index: usize) -> SessionResult<Layer> {
        if index >= self.layers.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.layers.len(),
            });
        }
        Ok(self.layers.remove(index))
    }

    /// Changes a layer's depth and re-sorts the stack.
    ///
    /// Returns the layer's new index, which may differ from `index`; callers
    /// holding selection state keyed by the old index must invalidate it
    /// when the two differ.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IndexOutOfRange`] for a bad index.
    pub fn change_layer_depth(&mut self, index: usize, new_depth: u8) -> SessionResult<usize> {
        if index >= self.layers.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.layers.len(),
            });
        }
        let mut layer = self.layers.remove(index);
        layer.depth = new_depth;
        let new_index = self.layers.partition_point(|l| l.depth <= new_depth);
        self.layers.insert(new_index, layer);
        debug!(index, new_index, new_depth, "layer depth changed");
        Ok(new_index)
    }

    /// Redistributes layer depths evenly over the full range.
    ///
    /// Used when depths are degenerate (all equal, or all unset); relative
    /// order is preserved. A single layer sits at the range midpoint.
    pub fn balance_depths(&mut self) {
        let n = self.layers.len();
        match n {
            0 => {}
            1 => self.layers[0].depth = MID_DEPTH,
            _ => {
                for (i, layer) in self.layers.iter_mut().enumerate() {
                    layer.depth = (i * 255 / (n - 1)) as u8;
                }
            }
        }
        info!(layers = n, "depths balanced");
    }

    /// Snapshots a new revision identity for a layer after a pixel edit.
    ///
    /// Computes the next `_vN` name from the current identity, records it
    /// (truncating any redo entries) and returns it. The caller writes the
    /// pixels to that file.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IndexOutOfRange`] for a bad index.
    pub fn record_revision(&mut self, index: usize) -> SessionResult<PathBuf> {
        let len = self.layers.len();
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(SessionError::IndexOutOfRange { index, len })?;
        let next = filename_add_version(layer.file());
        layer.revisions_mut().record(next.clone());
        debug!(index, file = %next.display(), "revision recorded");
        Ok(next)
    }

    /// Moves a layer's history cursor and restores that file identity.
    ///
    /// `forward == false` undoes, `forward == true` redoes. Returns
    /// `Ok(false)` without any state change when already at the history
    /// boundary - a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IndexOutOfRange`] for a bad index.
    pub fn undo(&mut self, index: usize, forward: bool) -> SessionResult<bool> {
        let len = self.layers.len();
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(SessionError::IndexOutOfRange { index, len })?;
        Ok(layer.revisions_mut().step(forward))
    }

    /// Whether a history step is available, driving UI affordances.
    ///
    /// A bad index reports `false` rather than an error.
    pub fn can_undo(&self, index: usize, forward: bool) -> bool {
        self.layers
            .get(index)
            .is_some_and(|l| l.revisions().can_step(forward))
    }

    /// Reinstates a persisted threshold set without recomputation.
    pub(crate) fn restore_thresholds(&mut self, thresholds: ThresholdSet) {
        self.num_layers = thresholds.bands();
        self.thresholds = Some(thresholds);
    }

    /// Drops the threshold state (loading a manifest without one).
    pub(crate) fn clear_thresholds(&mut self) {
        self.thresholds = None;
    }

    /// Appends a persisted layer, re-sorting the stack afterwards.
    pub(crate) fn restore_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
        self.layers.sort_by_key(|l| l.depth);
    }

    /// First `slice_N.png` name not used by any current revision entry.
    fn unused_slice_name(&self) -> PathBuf {
        let used: Vec<&Path> = self
            .layers
            .iter()
            .flat_map(|l| l.revisions().entries().iter().map(PathBuf::as_path))
            .collect();
        let mut n = self.layers.len();
        loop {
            let candidate = PathBuf::from(format!("slice_{n}.png"));
            if !used.contains(&candidate.as_path()) {
                return candidate;
            }
            n += 1;
        }
    }
}
