//! Depth-map cleanup for displacement export.
//!
//! A raw per-layer depth estimate is unusable for displacement as-is: the
//! matte's feathered edge carries garbage depth, and displaced geometry
//! samples slightly past the matte boundary, which would tear the texture.
//! [`clean_depth`] zeroes depth outside the visible region, fills the
//! feather band from a heavily blurred copy, pushes valid depth outward past
//! the matte edge, and re-anchors the black level.

use crate::{filter, morph, OpsResult};
use plx_core::{DepthMap, Error, GrayImage};
use tracing::{debug, warn};

/// Tuning for [`clean_depth`].
#[derive(Debug, Clone, Copy)]
pub struct CleanDepthOptions {
    /// Kernel size of the wide blur that replaces feather-edge depth.
    pub edge_blur: usize,
    /// Kernel size of the light settling blur before dilation.
    pub fill_blur: usize,
    /// 3x3 dilation steps pushing depth past the matte boundary.
    pub dilate_iterations: usize,
}

impl Default for CleanDepthOptions {
    fn default() -> Self {
        Self {
            edge_blur: 15,
            fill_blur: 5,
            dilate_iterations: 20,
        }
    }
}

/// Cleans a layer's depth map against its alpha matte.
///
/// Steps, in order:
///
/// 1. zero every sample outside the fully opaque (alpha == 255) region
/// 2. erode the matte one 3x3 step to drop feathered edge pixels
/// 3. where the eroded matte is not opaque, take samples from a
///    `edge_blur`-wide blurred copy
/// 4. settle with a `fill_blur` blur, then dilate `dilate_iterations` steps
///    so valid depth extends past the matte boundary
/// 5. subtract the 1st-percentile depth over the eroded-opaque region and
///    clip back to `[0, 255]`
///
/// The output carries defined depth over a region larger than the opaque
/// input region by `dilate_iterations` pixels; displaced card geometry that
/// samples just outside the matte finds real values there.
///
/// # Errors
///
/// Returns a dimension mismatch error if depth map and alpha differ in size.
pub fn clean_depth(
    depth: &DepthMap,
    alpha: &GrayImage,
    opts: &CleanDepthOptions,
) -> OpsResult<DepthMap> {
    if depth.dimensions() != alpha.dimensions() {
        return Err(Error::dimension_mismatch(depth.dimensions(), alpha.dimensions()).into());
    }

    let mut out = depth.clone();
    {
        let data = out.data_mut();
        for (d, &a) in data.iter_mut().zip(alpha.data().iter()) {
            if a != 255 {
                *d = 0;
            }
        }
    }

    let eroded = morph::erode(alpha, 1);

    let blurred = filter::box_blur(&out, opts.edge_blur);
    {
        let data = out.data_mut();
        for (i, (&e, &b)) in eroded.data().iter().zip(blurred.data().iter()).enumerate() {
            if e != 255 {
                data[i] = b;
            }
        }
    }

    out = filter::box_blur(&out, opts.fill_blur);
    out = morph::dilate(&out, opts.dilate_iterations);

    let mut opaque: Vec<u8> = out
        .data()
        .iter()
        .zip(eroded.data().iter())
        .filter(|&(_, &e)| e == 255)
        .map(|(&d, _)| d)
        .collect();
    if opaque.is_empty() {
        warn!("no fully opaque pixels; skipping black-level normalization");
        return Ok(out);
    }
    opaque.sort_unstable();
    let floor = percentile(&opaque, 0.01);
    debug!(floor, "normalizing black level");

    let data = out.data_mut();
    for d in data.iter_mut() {
        *d = (*d as i16 - floor as i16).clamp(0, 255) as u8;
    }
    Ok(out)
}

/// Linear-interpolated percentile of sorted samples, truncated to integer.
fn percentile(sorted: &[u8], q: f64) -> u8 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    let value = sorted[lo] as f64 * (1.0 - frac) + sorted[hi] as f64 * frac;
    value as u8
}
