//! Depth threshold selection and repair.
//!
//! A [`ThresholdSet`] partitions the 8-bit depth range into N bands via N+1
//! strictly increasing boundaries, `t0 = 0` and `tN = 255` always included.
//! Bands are half-open `[t_i, t_{i+1})` except the last, which is closed so
//! depth 255 belongs to the farthest band.
//!
//! Two policies pick the interior boundaries:
//!
//! - [`ThresholdSet::even`] - uniform spacing, used before any depth map
//!   exists
//! - [`ThresholdSet::from_histogram`] - equal-mass split of the cumulative
//!   depth histogram, so every band covers roughly the same pixel population
//!
//! User-proposed boundaries go through [`ThresholdSet::adjust`], which
//! repairs them to strict monotonicity and reports "unchanged" as `None` so
//! callers can skip re-slicing.

use crate::{OpsError, OpsResult};
use plx_core::DepthMap;
use tracing::debug;

/// Maximum supported band count.
///
/// 254 interior values exist at most; well before that the bands stop being
/// useful, so the limit is conservative.
pub const MAX_BANDS: usize = 128;

/// Ordered depth band boundaries: `0 = t0 < t1 < ... < tN = 255`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSet {
    bounds: Vec<u8>,
}

impl ThresholdSet {
    /// Evenly spaced thresholds for `num_layers` bands.
    ///
    /// Interior boundaries are `round(i * 255 / num_layers)`.
    ///
    /// # Panics
    ///
    /// Panics if `num_layers` is not in `2..=128`; asking for fewer bands
    /// than two is a programming error, not a user-recoverable condition.
    pub fn even(num_layers: usize) -> Self {
        assert!(
            (2..=MAX_BANDS).contains(&num_layers),
            "layer count {num_layers} outside 2..={MAX_BANDS}"
        );
        let mut bounds = Vec::with_capacity(num_layers + 1);
        bounds.push(0);
        for i in 1..num_layers {
            bounds.push(((i * 255 + num_layers / 2) / num_layers) as u8);
        }
        bounds.push(255);
        Self { bounds }
    }

    /// Thresholds balancing pixel population across bands.
    ///
    /// Walks the cumulative depth histogram and cuts where it crosses each
    /// `k/num_layers` fraction of the total mass. Degenerate histograms
    /// (e.g. a constant depth map) still yield strictly increasing
    /// boundaries via the same repair pass as [`ThresholdSet::adjust`].
    ///
    /// # Panics
    ///
    /// Panics if `num_layers` is not in `2..=128`.
    pub fn from_histogram(depth: &DepthMap, num_layers: usize) -> Self {
        assert!(
            (2..=MAX_BANDS).contains(&num_layers),
            "layer count {num_layers} outside 2..={MAX_BANDS}"
        );
        let hist = histogram(depth);
        let total: u64 = hist.iter().map(|&c| c as u64).sum();

        let mut interior = Vec::with_capacity(num_layers - 1);
        let mut cum = 0u64;
        let mut value = 0usize;
        for k in 1..num_layers {
            let target = total * k as u64 / num_layers as u64;
            while value < 256 && cum < target {
                cum += hist[value] as u64;
                value += 1;
            }
            interior.push(value as i32);
        }
        repair_interior(&mut interior);

        let mut bounds = Vec::with_capacity(num_layers + 1);
        bounds.push(0);
        bounds.extend(interior.iter().map(|&v| v as u8));
        bounds.push(255);
        debug!(num_layers, ?bounds, "histogram thresholds");
        Self { bounds }
    }

    /// Builds a set from explicit boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::InvalidParameter`] unless the boundaries start at
    /// 0, end at 255, are strictly increasing and describe at least one band.
    pub fn from_boundaries(bounds: Vec<u8>) -> OpsResult<Self> {
        if bounds.len() < 2 {
            return Err(OpsError::invalid_parameter("need at least two boundaries"));
        }
        if bounds[0] != 0 || bounds[bounds.len() - 1] != 255 {
            return Err(OpsError::invalid_parameter(
                "boundaries must start at 0 and end at 255",
            ));
        }
        if !bounds.windows(2).all(|w| w[0] < w[1]) {
            return Err(OpsError::invalid_parameter(
                "boundaries must be strictly increasing",
            ));
        }
        Ok(Self { bounds })
    }

    /// Number of depth bands.
    #[inline]
    pub fn bands(&self) -> usize {
        self.bounds.len() - 1
    }

    /// All boundaries, including the fixed 0 and 255 endpoints.
    #[inline]
    pub fn boundaries(&self) -> &[u8] {
        &self.bounds
    }

    /// The user-adjustable interior boundaries.
    #[inline]
    pub fn interior(&self) -> &[u8] {
        &self.bounds[1..self.bounds.len() - 1]
    }

    /// Lower and upper boundary of band `i`.
    ///
    /// The band covers `[lo, hi)`, or `[lo, hi]` for the last band.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.bands()`.
    #[inline]
    pub fn band_bounds(&self, i: usize) -> (u8, u8) {
        (self.bounds[i], self.bounds[i + 1])
    }

    /// Index of the band containing `depth`.
    pub fn band_of(&self, depth: u8) -> usize {
        for i in 0..self.bands() {
            let (lo, hi) = self.band_bounds(i);
            if depth >= lo && (depth < hi || (i == self.bands() - 1 && depth <= hi)) {
                return i;
            }
        }
        // depth == 255 in the last band; unreachable otherwise
        self.bands() - 1
    }

    /// Repairs a caller-proposed interior boundary vector against this set.
    ///
    /// Runs the forward pass (first value clamped to >= 1, each value forced
    /// above its predecessor) and the backward pass (last value clamped to
    /// <= 254, each value forced below its successor), then compares against
    /// the stored boundaries. Returns `None` when the repaired vector equals
    /// the current one, so callers can treat the call as a cheap idempotence
    /// check and skip re-slicing.
    ///
    /// # Panics
    ///
    /// Panics if `proposed.len() != self.bands() - 1`; passing fewer
    /// thresholds than bands is a programming error.
    pub fn adjust(&self, proposed: &[u8]) -> Option<ThresholdSet> {
        assert_eq!(
            proposed.len(),
            self.bands() - 1,
            "expected {} interior thresholds, got {}",
            self.bands() - 1,
            proposed.len()
        );
        let mut interior: Vec<i32> = proposed.iter().map(|&v| v as i32).collect();
        repair_interior(&mut interior);

        if interior
            .iter()
            .zip(self.interior())
            .all(|(&a, &b)| a == b as i32)
        {
            return None;
        }

        let mut bounds = Vec::with_capacity(self.bounds.len());
        bounds.push(0);
        bounds.extend(interior.iter().map(|&v| v as u8));
        bounds.push(255);
        Some(ThresholdSet { bounds })
    }
}

/// Per-value depth sample counts.
pub fn histogram(depth: &DepthMap) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in depth.data() {
        hist[v as usize] += 1;
    }
    hist
}

/// Forces an interior boundary vector into `1..=254`, strictly increasing.
///
/// Forward then backward pass, exactly the two clamping sweeps the slider
/// callback performs: left to right each value must exceed its predecessor,
/// right to left each value must stay below its successor.
fn repair_interior(values: &mut [i32]) {
    if values.is_empty() {
        return;
    }
    if values[0] < 1 {
        values[0] = 1;
    }
    for i in 1..values.len() {
        if values[i] <= values[i - 1] {
            values[i] = values[i - 1] + 1;
        }
    }
    let last = values.len() - 1;
    if values[last] > 254 {
        values[last] = 254;
    }
    for i in (0..last).rev() {
        if values[i] >= values[i + 1] {
            values[i] = values[i + 1] - 1;
        }
    }
}
