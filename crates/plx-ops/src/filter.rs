//! Box blur for single-channel buffers.
//!
//! The depth postprocessor leans on repeated mean filtering: a wide blur to
//! fill feathered edges, a narrow one to settle the field before dilation.
//! The filter is separable; the horizontal pass uses a sliding window sum,
//! and both passes process rows in parallel. Borders replicate the edge
//! sample.

use plx_core::GrayImage;
use rayon::prelude::*;
use tracing::trace;

/// Mean filter with a `ksize` x `ksize` window.
///
/// Even kernel sizes are rounded up to the next odd size. `ksize <= 1`
/// returns the input unchanged.
///
/// # Example
///
/// ```rust
/// use plx_core::GrayImage;
/// use plx_ops::filter::box_blur;
///
/// let mut img = GrayImage::new(9, 9);
/// img.set_sample(4, 4, 90);
/// let blurred = box_blur(&img, 3);
/// assert_eq!(blurred.sample(4, 4), 10); // 90 spread over 9 samples
/// ```
pub fn box_blur(src: &GrayImage, ksize: usize) -> GrayImage {
    if ksize <= 1 || src.is_empty() {
        return src.clone();
    }
    let ksize = if ksize % 2 == 0 { ksize + 1 } else { ksize };
    let radius = ksize / 2;
    let (w, h) = (src.width() as usize, src.height() as usize);
    trace!(w, h, ksize, "box_blur");

    // Horizontal pass: sliding sum per row.
    let mut horiz = vec![0u16; w * h];
    horiz
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, out_row)| {
            let row = src.row(y as u32);
            let clamp = |i: isize| row[i.clamp(0, w as isize - 1) as usize] as u32;
            let mut sum: u32 = 0;
            for i in -(radius as isize)..=(radius as isize) {
                sum += clamp(i);
            }
            for x in 0..w {
                // Average scaled to u16 to limit rounding drift across passes.
                out_row[x] =
                    (((sum * 256) + ksize as u32 / 2) / ksize as u32).min(u16::MAX as u32) as u16;
                sum += clamp(x as isize + radius as isize + 1);
                sum -= clamp(x as isize - radius as isize);
            }
        });

    // Vertical pass: windowed sum over the horizontal averages.
    let mut out = GrayImage::new(src.width(), src.height());
    out.data_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, out_row)| {
            for x in 0..w {
                let mut sum: u32 = 0;
                for dy in -(radius as isize)..=(radius as isize) {
                    let sy = (y as isize + dy).clamp(0, h as isize - 1) as usize;
                    sum += horiz[sy * w + x] as u32;
                }
                out_row[x] = ((sum / ksize as u32 + 128) / 256).min(255) as u8;
            }
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_preserves_constant_field() {
        let img = GrayImage::filled(16, 12, 200);
        let blurred = box_blur(&img, 5);
        assert!(blurred.data().iter().all(|&v| v == 200));
    }

    #[test]
    fn blur_ksize_one_is_identity() {
        let mut img = GrayImage::new(4, 4);
        img.set_sample(1, 1, 42);
        assert_eq!(box_blur(&img, 1), img);
    }

    #[test]
    fn blur_spreads_impulse() {
        let mut img = GrayImage::new(9, 9);
        img.set_sample(4, 4, 255);
        let blurred = box_blur(&img, 3);
        assert!(blurred.sample(4, 4) > 0);
        assert!(blurred.sample(3, 4) > 0);
        assert_eq!(blurred.sample(0, 0), 0);
    }

    #[test]
    fn blur_even_ksize_rounds_up() {
        let img = GrayImage::filled(8, 8, 100);
        assert_eq!(box_blur(&img, 4), box_blur(&img, 5));
    }

    #[test]
    fn blur_replicates_borders() {
        // A constant left half should stay constant at the left border.
        let mut img = GrayImage::filled(16, 4, 80);
        for y in 0..4 {
            for x in 12..16 {
                img.set_sample(x, y, 0);
            }
        }
        let blurred = box_blur(&img, 3);
        assert_eq!(blurred.sample(0, 0), 80);
        assert_eq!(blurred.sample(0, 3), 80);
    }
}
