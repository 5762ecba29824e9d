//! Slice and matte generation.
//!
//! A matte is the coverage mask of one layer. Mattes come from two places:
//! depth bands (automatic slicing) and free-form masks (clicks, model
//! segmentation, brush strokes). Both flow through the same composition
//! step: expand the matte so adjacent layers overlap, soften its edge, and
//! stamp it into the alpha channel of an RGBA copy of the source.

use crate::threshold::ThresholdSet;
use crate::{morph, OpsError, OpsResult};
use plx_core::{DepthMap, Error, GrayImage, RgbaImage};
use tracing::debug;

/// Binary matte of the depth band `[lo, hi)`, or `[lo, hi]` when `closed`.
///
/// Member pixels are 255, everything else 0.
pub fn band_matte(depth: &DepthMap, lo: u8, hi: u8, closed: bool) -> GrayImage {
    let mut out = GrayImage::new(depth.width(), depth.height());
    let data = out.data_mut();
    for (i, &d) in depth.data().iter().enumerate() {
        if d >= lo && (d < hi || (closed && d == hi)) {
            data[i] = 255;
        }
    }
    out
}

/// Expands a matte by `expand` dilation steps and softens its edge.
///
/// The overlap hides seams between adjacent cards under oblique camera
/// angles. With `expand == 0` the matte is returned untouched (hard edge),
/// which keeps hand-drawn masks exact.
pub fn expand_matte(mask: &GrayImage, expand: usize) -> GrayImage {
    if expand == 0 {
        return mask.clone();
    }
    let grown = morph::dilate(mask, expand);
    crate::filter::box_blur(&grown, 3)
}

/// Builds an RGBA slice from a source image and a coverage mask.
///
/// RGB is copied from the source; alpha is the expanded matte limited by the
/// source's own alpha, so transparent source pixels never become visible.
///
/// # Errors
///
/// Returns a dimension mismatch error if image and mask differ in size.
pub fn create_slice_from_mask(
    image: &RgbaImage,
    mask: &GrayImage,
    expand: usize,
) -> OpsResult<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(Error::dimension_mismatch(image.dimensions(), mask.dimensions()).into());
    }
    let matte = expand_matte(mask, expand);
    let mut out = image.clone();
    let data = out.data_mut();
    for (px, &m) in data.chunks_exact_mut(4).zip(matte.data().iter()) {
        px[3] = px[3].min(m);
    }
    Ok(out)
}

/// Splits an image into one RGBA layer per depth band.
///
/// Returns the layers (nearest band first, following the ascending-depth
/// ordering) and each layer's representative depth: the integer mean depth
/// of the band's member pixels, or the band midpoint when the band is empty.
/// An empty band yields a fully transparent layer, not an error; exporters
/// skip such layers.
///
/// # Errors
///
/// Returns a dimension mismatch error if image and depth map differ in size.
pub fn generate_layers(
    image: &RgbaImage,
    depth: &DepthMap,
    thresholds: &ThresholdSet,
    matte_expand: usize,
) -> OpsResult<(Vec<RgbaImage>, Vec<u8>)> {
    if image.dimensions() != depth.dimensions() {
        return Err(Error::dimension_mismatch(image.dimensions(), depth.dimensions()).into());
    }

    let bands = thresholds.bands();
    let mut layers = Vec::with_capacity(bands);
    let mut depths = Vec::with_capacity(bands);

    for band in 0..bands {
        let (lo, hi) = thresholds.band_bounds(band);
        let closed = band == bands - 1;
        let matte = band_matte(depth, lo, hi, closed);

        let mut sum = 0u64;
        let mut count = 0u64;
        for (&m, &d) in matte.data().iter().zip(depth.data().iter()) {
            if m == 255 {
                sum += d as u64;
                count += 1;
            }
        }
        let rep = if count > 0 {
            ((sum + count / 2) / count) as u8
        } else {
            lo / 2 + hi / 2 + (lo % 2 + hi % 2) / 2
        };

        debug!(band, lo, hi, members = count, depth = rep, "slicing band");
        layers.push(create_slice_from_mask(image, &matte, matte_expand)?);
        depths.push(rep);
    }

    Ok((layers, depths))
}

/// Clears a layer's alpha wherever `mask` is set.
///
/// Returns the resulting alpha plane; samples outside the mask are
/// untouched. The caller decides whether to stamp the plane back into the
/// layer.
///
/// # Errors
///
/// Returns a dimension mismatch error if layer and mask differ in size.
pub fn remove_mask_from_alpha(layer: &RgbaImage, mask: &GrayImage) -> OpsResult<GrayImage> {
    if layer.dimensions() != mask.dimensions() {
        return Err(Error::dimension_mismatch(layer.dimensions(), mask.dimensions()).into());
    }
    let mut out = layer.alpha_plane();
    let data = out.data_mut();
    for (a, &m) in data.iter_mut().zip(mask.data().iter()) {
        if m > 0 {
            *a = 0;
        }
    }
    Ok(out)
}

/// Matte of the depth band containing the pixel at `(x, y)`.
///
/// Interactive selection: a click on the image picks the band its depth
/// falls into. Returns the band's binary matte together with the clicked
/// pixel's depth.
///
/// # Errors
///
/// Returns [`plx_core::Error::OutOfBounds`] if `(x, y)` is outside the map.
pub fn band_mask_at(
    depth: &DepthMap,
    thresholds: &ThresholdSet,
    x: u32,
    y: u32,
) -> OpsResult<(GrayImage, u8)> {
    let d = depth
        .get_sample(x, y)
        .ok_or_else(|| OpsError::from(Error::out_of_bounds(x, y, depth.width(), depth.height())))?;
    let band = thresholds.band_of(d);
    let (lo, hi) = thresholds.band_bounds(band);
    let closed = band == thresholds.bands() - 1;
    Ok((band_matte(depth, lo, hi, closed), d))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_depth(w: u32, h: u32, near: u8, far: u8) -> DepthMap {
        let mut depth = GrayImage::filled(w, h, near);
        for y in 0..h {
            for x in 0..w {
                if (x + y) % 2 == 0 {
                    depth.set_sample(x, y, far);
                }
            }
        }
        depth
    }

    #[test]
    fn band_matte_half_open() {
        let depth = GrayImage::from_data(2, 2, vec![0, 127, 128, 255]).unwrap();
        let matte = band_matte(&depth, 0, 128, false);
        assert_eq!(matte.data(), &[255, 255, 0, 0]);
        let far = band_matte(&depth, 128, 255, true);
        assert_eq!(far.data(), &[0, 0, 255, 255]);
    }

    #[test]
    fn single_band_covers_all_opaque_pixels() {
        let mut image = RgbaImage::filled(8, 8, [50, 60, 70, 255]);
        image.set_pixel(0, 0, [0, 0, 0, 0]); // transparent source pixel
        let depth = checker_depth(8, 8, 10, 240);
        let thresholds = ThresholdSet::from_boundaries(vec![0, 255]).unwrap();
        let (layers, _) = generate_layers(&image, &depth, &thresholds, 3).unwrap();
        assert_eq!(layers.len(), 1);
        // Alpha equals the union of opaque source pixels.
        assert_eq!(layers[0].alpha(0, 0), 0);
        assert_eq!(layers[0].alpha(3, 3), 255);
    }

    #[test]
    fn two_band_scene_splits_block() {
        // 100x100 at depth 0 except a 40x40 block at depth 200.
        let image = RgbaImage::filled(100, 100, [90, 90, 90, 255]);
        let mut depth = GrayImage::new(100, 100);
        for y in 30..70 {
            for x in 30..70 {
                depth.set_sample(x, y, 200);
            }
        }
        let thresholds = ThresholdSet::from_boundaries(vec![0, 128, 255]).unwrap();
        let (layers, depths) = generate_layers(&image, &depth, &thresholds, 0).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(depths[0], 0);
        assert_eq!(depths[1], 200);
        // Near layer: opaque everywhere except the block.
        assert_eq!(layers[0].alpha(0, 0), 255);
        assert_eq!(layers[0].alpha(50, 50), 0);
        // Far layer: opaque only inside the block.
        assert_eq!(layers[1].alpha(50, 50), 255);
        assert_eq!(layers[1].alpha(0, 0), 0);
    }

    #[test]
    fn expanded_matte_overlaps_neighbour() {
        let image = RgbaImage::filled(40, 40, [1, 2, 3, 255]);
        let mut depth = GrayImage::new(40, 40);
        for y in 10..30 {
            for x in 10..30 {
                depth.set_sample(x, y, 250);
            }
        }
        let thresholds = ThresholdSet::from_boundaries(vec![0, 128, 255]).unwrap();
        let (layers, _) = generate_layers(&image, &depth, &thresholds, 2).unwrap();
        // The far layer grew past the raw band boundary.
        assert!(layers[1].alpha(8, 20) > 0);
        // Both layers cover the boundary region.
        assert!(layers[0].alpha(9, 20) > 0);
    }

    #[test]
    fn empty_band_is_transparent_with_midpoint_depth() {
        let image = RgbaImage::filled(4, 4, [9, 9, 9, 255]);
        let depth = GrayImage::filled(4, 4, 250);
        let thresholds = ThresholdSet::from_boundaries(vec![0, 128, 255]).unwrap();
        let (layers, depths) = generate_layers(&image, &depth, &thresholds, 0).unwrap();
        assert!(layers[0].is_fully_transparent());
        assert_eq!(depths[0], 64);
        assert_eq!(depths[1], 250);
    }

    #[test]
    fn generate_layers_rejects_mismatched_depth() {
        let image = RgbaImage::new(4, 4);
        let depth = GrayImage::new(5, 4);
        let thresholds = ThresholdSet::even(2);
        assert!(generate_layers(&image, &depth, &thresholds, 0).is_err());
    }

    #[test]
    fn remove_then_create_restores_matte() {
        let image = RgbaImage::filled(20, 20, [10, 20, 30, 255]);
        let mut mask = GrayImage::new(20, 20);
        for y in 5..15 {
            for x in 5..15 {
                mask.set_sample(x, y, 255);
            }
        }
        let expand = 2;
        let slice = create_slice_from_mask(&image, &mask, expand).unwrap();
        let original_alpha = slice.alpha_plane();

        // Remove the mask region, then add it back via a fresh slice.
        let mut edited = slice.clone();
        let cleared = remove_mask_from_alpha(&edited, &mask).unwrap();
        edited.set_alpha_plane(&cleared).unwrap();
        let readded = create_slice_from_mask(&image, &mask, expand).unwrap();
        let mut merged = edited.alpha_plane();
        for (m, &r) in merged
            .data_mut()
            .iter_mut()
            .zip(readded.alpha_plane().data().iter())
        {
            *m = (*m).max(r);
        }
        assert_eq!(merged, original_alpha);
    }

    #[test]
    fn band_mask_at_picks_containing_band() {
        let mut depth = GrayImage::new(10, 10);
        depth.set_sample(7, 7, 210);
        let thresholds = ThresholdSet::from_boundaries(vec![0, 128, 255]).unwrap();
        let (mask, d) = band_mask_at(&depth, &thresholds, 7, 7).unwrap();
        assert_eq!(d, 210);
        assert_eq!(mask.sample(7, 7), 255);
        assert_eq!(mask.sample(0, 0), 0);
        assert!(band_mask_at(&depth, &thresholds, 10, 0).is_err());
    }
}
