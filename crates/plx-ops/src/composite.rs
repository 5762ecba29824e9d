//! Alpha compositing and mask combination.
//!
//! Layers hold straight (non-premultiplied) alpha. Blending a source over a
//! destination mixes RGB by the source alpha and keeps the larger of the two
//! alphas, which is how patched layer edits and the flattened preview are
//! produced.

use crate::OpsResult;
use plx_core::{Error, GrayImage, RgbaImage};
use tracing::trace;

/// Composites `src` over `dst` in place, weighted by `src`'s alpha.
///
/// `dst` RGB becomes `src * a + dst * (1 - a)`; `dst` alpha becomes
/// `max(dst.a, src.a)`. The exclusive `&mut` borrow is the mutation
/// contract: the destination is consumed and rewritten, and no other view of
/// its pixels can exist during the call.
///
/// # Errors
///
/// Returns a dimension mismatch error (destination untouched) if the images
/// differ in size.
pub fn blend_with_alpha(dst: &mut RgbaImage, src: &RgbaImage) -> OpsResult<()> {
    if dst.dimensions() != src.dimensions() {
        return Err(Error::dimension_mismatch(dst.dimensions(), src.dimensions()).into());
    }
    trace!(width = dst.width(), height = dst.height(), "blend_with_alpha");
    let out = dst.data_mut();
    for (d, s) in out.chunks_exact_mut(4).zip(src.data().chunks_exact(4)) {
        let a = s[3] as u32;
        let inv = 255 - a;
        for c in 0..3 {
            d[c] = ((s[c] as u32 * a + d[c] as u32 * inv + 127) / 255) as u8;
        }
        d[3] = d[3].max(s[3]);
    }
    Ok(())
}

/// Flattens a depth-ascending layer stack into one image.
///
/// Iterates far to near (descending index) so nearer layers occlude farther
/// ones. Returns `None` for an empty stack - a no-op, not an error.
///
/// # Errors
///
/// Returns a dimension mismatch error if any two layers differ in size.
pub fn compose_stack(layers: &[RgbaImage]) -> OpsResult<Option<RgbaImage>> {
    let Some(farthest) = layers.last() else {
        return Ok(None);
    };
    let mut acc = farthest.clone();
    for layer in layers[..layers.len() - 1].iter().rev() {
        blend_with_alpha(&mut acc, layer)?;
    }
    Ok(Some(acc))
}

/// Union of two masks: per-sample maximum.
///
/// # Errors
///
/// Returns a dimension mismatch error if the masks differ in size.
pub fn union_masks(a: &GrayImage, b: &GrayImage) -> OpsResult<GrayImage> {
    if a.dimensions() != b.dimensions() {
        return Err(Error::dimension_mismatch(a.dimensions(), b.dimensions()).into());
    }
    let mut out = a.clone();
    for (o, &s) in out.data_mut().iter_mut().zip(b.data().iter()) {
        *o = (*o).max(s);
    }
    Ok(out)
}

/// Subtracts mask `b` from mask `a`: per-sample `min(a, 255 - b)`.
///
/// # Errors
///
/// Returns a dimension mismatch error if the masks differ in size.
pub fn subtract_mask(a: &GrayImage, b: &GrayImage) -> OpsResult<GrayImage> {
    if a.dimensions() != b.dimensions() {
        return Err(Error::dimension_mismatch(a.dimensions(), b.dimensions()).into());
    }
    let mut out = a.clone();
    for (o, &s) in out.data_mut().iter_mut().zip(b.data().iter()) {
        *o = (*o).min(255 - s);
    }
    Ok(out)
}
