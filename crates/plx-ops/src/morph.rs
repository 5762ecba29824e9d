//! 3x3 grayscale morphology.
//!
//! Dilation pushes valid depth values past a matte edge and grows mattes to
//! overlap neighbouring layers; erosion strips feathered edge pixels before
//! the depth postprocessor samples an alpha mask. The square 3x3 structuring
//! element is separable, so each iteration is a horizontal and a vertical
//! 3-tap extremum pass.

use plx_core::GrayImage;
use rayon::prelude::*;
use tracing::trace;

#[derive(Clone, Copy, PartialEq)]
enum Extremum {
    Min,
    Max,
}

/// Grayscale dilation with a 3x3 square element, `iterations` times.
///
/// Each iteration replaces every sample by the maximum of its 3x3
/// neighbourhood (edge samples replicate).
pub fn dilate(src: &GrayImage, iterations: usize) -> GrayImage {
    trace!(iterations, "dilate");
    morph(src, iterations, Extremum::Max)
}

/// Grayscale erosion with a 3x3 square element, `iterations` times.
pub fn erode(src: &GrayImage, iterations: usize) -> GrayImage {
    trace!(iterations, "erode");
    morph(src, iterations, Extremum::Min)
}

fn morph(src: &GrayImage, iterations: usize, ex: Extremum) -> GrayImage {
    if iterations == 0 || src.is_empty() {
        return src.clone();
    }
    let (w, h) = (src.width() as usize, src.height() as usize);
    let mut current = src.data().to_vec();
    let mut scratch = vec![0u8; w * h];

    for _ in 0..iterations {
        // Horizontal 3-tap pass.
        scratch
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, out_row)| {
                let row = &current[y * w..(y + 1) * w];
                for x in 0..w {
                    let left = row[x.saturating_sub(1)];
                    let right = row[(x + 1).min(w - 1)];
                    out_row[x] = pick3(left, row[x], right, ex);
                }
            });
        // Vertical 3-tap pass.
        current
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, out_row)| {
                let above = &scratch[y.saturating_sub(1) * w..y.saturating_sub(1) * w + w];
                let here = &scratch[y * w..(y + 1) * w];
                let below_y = (y + 1).min(h - 1);
                let below = &scratch[below_y * w..below_y * w + w];
                for x in 0..w {
                    out_row[x] = pick3(above[x], here[x], below[x], ex);
                }
            });
    }

    let mut out = GrayImage::new(src.width(), src.height());
    out.data_mut().copy_from_slice(&current);
    out
}

#[inline]
fn pick3(a: u8, b: u8, c: u8, ex: Extremum) -> u8 {
    match ex {
        Extremum::Max => a.max(b).max(c),
        Extremum::Min => a.min(b).min(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dilate_grows_single_pixel() {
        let mut img = GrayImage::new(7, 7);
        img.set_sample(3, 3, 255);
        let out = dilate(&img, 1);
        assert_eq!(out.sample(2, 2), 255);
        assert_eq!(out.sample(4, 4), 255);
        assert_eq!(out.sample(1, 3), 0);
    }

    #[test]
    fn dilate_iterations_accumulate() {
        let mut img = GrayImage::new(11, 11);
        img.set_sample(5, 5, 200);
        let out = dilate(&img, 3);
        assert_eq!(out.sample(2, 5), 200);
        assert_eq!(out.sample(1, 5), 0);
    }

    #[test]
    fn erode_shrinks_block() {
        let mut img = GrayImage::new(8, 8);
        for y in 2..6 {
            for x in 2..6 {
                img.set_sample(x, y, 255);
            }
        }
        let out = erode(&img, 1);
        assert_eq!(out.sample(3, 3), 255);
        assert_eq!(out.sample(2, 2), 0);
        assert_eq!(out.sample(5, 3), 0);
    }

    #[test]
    fn erode_then_dilate_keeps_interior() {
        let img = GrayImage::filled(6, 6, 255);
        let out = dilate(&erode(&img, 1), 1);
        assert_eq!(out.sample(3, 3), 255);
    }

    #[test]
    fn zero_iterations_is_identity() {
        let mut img = GrayImage::new(4, 4);
        img.set_sample(0, 0, 9);
        assert_eq!(dilate(&img, 0), img);
        assert_eq!(erode(&img, 0), img);
    }
}
