//! Software dolly-animation renderer.
//!
//! Approximates a camera push through the card stack with pure 2D
//! compositing: per frame, each card's corners are projected through the
//! intrinsic matrix, a destination-to-source homography maps frame pixels
//! back into the layer texture, and the cards are painted back to front with
//! straight-alpha blending. No lighting, no occlusion tests beyond paint
//! order.

use crate::card::Card;
use crate::{SceneError, SceneResult};
use glam::{Mat3, Vec2, Vec3};
use plx_core::RgbaImage;
use plx_io::Compression;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cards closer than this are behind the camera and skipped.
const NEAR_LIMIT: f32 = 1e-3;

/// Renders a camera push toward the card stack.
///
/// The camera starts at `start_position` and moves along +z by
/// `push_distance` over `num_frames` linear steps. Frames are written as
/// `frame_000.png`, `frame_001.png`, ... into `output_dir` (created if
/// missing) at the layer resolution; the returned paths are in frame order.
///
/// Zero layers or zero frames is a no-op: `Ok(vec![])`, nothing written.
///
/// # Errors
///
/// Returns [`SceneError::InvalidInput`] if `layers` and `cards` lengths
/// differ, or an I/O error from frame writing.
pub fn render_sequence(
    output_dir: &Path,
    layers: &[RgbaImage],
    cards: &[Card],
    camera_matrix: &Mat3,
    start_position: Vec3,
    push_distance: f32,
    num_frames: usize,
) -> SceneResult<Vec<PathBuf>> {
    if layers.len() != cards.len() {
        return Err(SceneError::InvalidInput(format!(
            "{} layers but {} cards",
            layers.len(),
            cards.len()
        )));
    }
    if layers.is_empty() || num_frames == 0 {
        info!("nothing to render");
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(output_dir)?;

    // Paint far to near.
    let mut order: Vec<usize> = (0..cards.len()).collect();
    order.sort_by(|&a, &b| {
        cards[b]
            .distance()
            .partial_cmp(&cards[a].distance())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let (width, height) = layers[0].dimensions();
    let mut paths = Vec::with_capacity(num_frames);
    for frame in 0..num_frames {
        let t = if num_frames > 1 {
            frame as f32 / (num_frames - 1) as f32
        } else {
            0.0
        };
        let position = start_position + Vec3::new(0.0, 0.0, push_distance * t);

        let mut canvas = RgbaImage::new(width, height);
        for &i in &order {
            rasterize_card(&mut canvas, &layers[i], &cards[i], camera_matrix, position);
        }

        let path = output_dir.join(format!("frame_{frame:03}.png"));
        plx_io::write_rgba(&path, &canvas, Compression::Fast)?;
        debug!(frame, path = %path.display(), "frame written");
        paths.push(path);
    }
    info!(frames = paths.len(), dir = %output_dir.display(), "sequence rendered");
    Ok(paths)
}

/// Projects a camera-space point to pixel coordinates.
///
/// Returns `None` when the point is at or behind the camera plane.
fn project(camera: &Mat3, position: Vec3, point: Vec3) -> Option<Vec2> {
    let rel = point - position;
    if rel.z < NEAR_LIMIT {
        return None;
    }
    let fx = camera.x_axis.x;
    let (cx, cy) = (camera.z_axis.x, camera.z_axis.y);
    Some(Vec2::new(
        fx * rel.x / rel.z + cx,
        fx * rel.y / rel.z + cy,
    ))
}

/// Warps one card's texture onto the canvas with perspective correction.
fn rasterize_card(
    canvas: &mut RgbaImage,
    layer: &RgbaImage,
    card: &Card,
    camera: &Mat3,
    position: Vec3,
) {
    let Some(projected) = card
        .corners
        .iter()
        .map(|&c| project(camera, position, c))
        .collect::<Option<Vec<Vec2>>>()
    else {
        return; // card behind the camera
    };

    let (lw, lh) = layer.dimensions();
    let src_corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new((lw - 1) as f32, 0.0),
        Vec2::new(0.0, (lh - 1) as f32),
        Vec2::new((lw - 1) as f32, (lh - 1) as f32),
    ];
    let dst_corners = [projected[0], projected[1], projected[2], projected[3]];
    let Some(h) = homography(dst_corners, src_corners) else {
        return; // degenerate projection
    };

    let (cw, ch) = canvas.dimensions();
    let min_x = dst_corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let max_x = dst_corners.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = dst_corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = dst_corners.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
    let x0 = (min_x.floor().max(0.0)) as u32;
    let x1 = (max_x.ceil().min((cw - 1) as f32)).max(0.0) as u32;
    let y0 = (min_y.floor().max(0.0)) as u32;
    let y1 = (max_y.ceil().min((ch - 1) as f32)).max(0.0) as u32;
    if x1 < x0 || y1 < y0 {
        return;
    }

    let width = cw as usize;
    canvas
        .data_mut()
        .par_chunks_mut(width * 4)
        .enumerate()
        .filter(|(y, _)| *y as u32 >= y0 && *y as u32 <= y1)
        .for_each(|(y, row)| {
            for x in x0..=x1 {
                let src = apply_homography(&h, Vec2::new(x as f32, y as f32));
                let sample = sample_bilinear(layer, src.x, src.y);
                if sample[3] <= 0.0 {
                    continue;
                }
                let o = x as usize * 4;
                let dst = [
                    row[o] as f32,
                    row[o + 1] as f32,
                    row[o + 2] as f32,
                    row[o + 3] as f32,
                ];
                let out = over(sample, dst);
                for c in 0..4 {
                    row[o + c] = out[c].round().clamp(0.0, 255.0) as u8;
                }
            }
        });
}

/// Porter-Duff over for straight-alpha 8-bit pixels lifted to f32.
fn over(fg: [f32; 4], bg: [f32; 4]) -> [f32; 4] {
    let fa = fg[3] / 255.0;
    let ba = bg[3] / 255.0;
    let oa = fa + ba * (1.0 - fa);
    if oa <= f32::EPSILON {
        return [0.0, 0.0, 0.0, 0.0];
    }
    let mut out = [0.0f32; 4];
    for c in 0..3 {
        out[c] = (fg[c] * fa + bg[c] * ba * (1.0 - fa)) / oa;
    }
    out[3] = oa * 255.0;
    out
}

/// Bilinear RGBA sample; fully transparent outside the image.
fn sample_bilinear(img: &RgbaImage, x: f32, y: f32) -> [f32; 4] {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x > (w - 1) as f32 || y > (h - 1) as f32 {
        return [0.0; 4];
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let mut out = [0.0f32; 4];
    let p00 = img.pixel(x0, y0);
    let p10 = img.pixel(x1, y0);
    let p01 = img.pixel(x0, y1);
    let p11 = img.pixel(x1, y1);
    for c in 0..4 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = top * (1.0 - fy) + bottom * fy;
    }
    out
}

/// Homography mapping four source points onto four destination points.
///
/// Direct linear transform with `h22 = 1`, solved by Gaussian elimination
/// with partial pivoting. Returns `None` for degenerate (collinear or
/// repeated) point sets.
pub fn homography(src: [Vec2; 4], dst: [Vec2; 4]) -> Option<[f32; 9]> {
    let mut m = [[0.0f64; 9]; 8];
    for i in 0..4 {
        let (x, y) = (src[i].x as f64, src[i].y as f64);
        let (u, v) = (dst[i].x as f64, dst[i].y as f64);
        m[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
        m[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
    }

    // Forward elimination with partial pivoting on the 8x8 system.
    for col in 0..8 {
        let pivot = (col..8).max_by(|&a, &b| {
            m[a][col]
                .abs()
                .partial_cmp(&m[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if m[pivot][col].abs() < 1e-10 {
            return None;
        }
        m.swap(col, pivot);
        for row in (col + 1)..8 {
            let factor = m[row][col] / m[col][col];
            for k in col..9 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    // Back substitution.
    let mut h = [0.0f64; 8];
    for row in (0..8).rev() {
        let mut acc = m[row][8];
        for k in (row + 1)..8 {
            acc -= m[row][k] * h[k];
        }
        h[row] = acc / m[row][row];
    }

    Some([
        h[0] as f32,
        h[1] as f32,
        h[2] as f32,
        h[3] as f32,
        h[4] as f32,
        h[5] as f32,
        h[6] as f32,
        h[7] as f32,
        1.0,
    ])
}

/// Applies a homography to a point.
#[inline]
pub fn apply_homography(h: &[f32; 9], p: Vec2) -> Vec2 {
    let w = h[6] * p.x + h[7] * p.y + h[8];
    if w.abs() < f32::EPSILON {
        return Vec2::new(f32::MIN, f32::MIN);
    }
    Vec2::new(
        (h[0] * p.x + h[1] * p.y + h[2]) / w,
        (h[3] * p.x + h[4] * p.y + h[5]) / w,
    )
}
