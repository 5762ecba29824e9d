//! PNG reading and writing.
//!
//! Reads normalize any 8-bit PNG layout into [`RgbaImage`] or [`GrayImage`]:
//! grayscale fans out to RGBA, missing alpha becomes fully opaque, and RGBA
//! sources collapse to their first channel when read as gray (depth side
//! files are sometimes saved as RGBA by external editors).

use crate::{IoError, IoResult};
use plx_core::{GrayImage, RgbaImage};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::trace;

/// PNG compression level.
///
/// `Fast` mirrors the low-compression bulk writes of depth textures and
/// animation frames, where encode time dominates file size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// Balanced default.
    #[default]
    Default,
    /// Fastest encode, larger files.
    Fast,
}

impl Compression {
    fn to_png(self) -> png::Compression {
        match self {
            Self::Default => png::Compression::default(),
            Self::Fast => png::Compression::Fast,
        }
    }
}

fn decode(path: &Path) -> IoResult<(png::OutputInfo, Vec<u8>)> {
    let file = File::open(path)?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let mut reader = decoder.read_info().map_err(|e| IoError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let buf_size = reader.output_buffer_size().ok_or_else(|| IoError::Decode {
        path: path.to_path_buf(),
        reason: "cannot determine output buffer size".into(),
    })?;
    let mut buf = vec![0u8; buf_size];
    let info = reader.next_frame(&mut buf).map_err(|e| IoError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    buf.truncate(info.buffer_size());
    Ok((info, buf))
}

/// Reads a PNG as an RGBA image.
///
/// # Errors
///
/// Returns [`IoError::UnsupportedFormat`] for bit depths other than eight.
pub fn read_rgba<P: AsRef<Path>>(path: P) -> IoResult<RgbaImage> {
    let path = path.as_ref();
    let (info, buf) = decode(path)?;
    trace!(path = %path.display(), ?info.color_type, "read_rgba");

    let rgba: Vec<u8> = match (info.color_type, info.bit_depth) {
        (png::ColorType::Rgba, png::BitDepth::Eight) => buf,
        (png::ColorType::Rgb, png::BitDepth::Eight) => buf
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        (png::ColorType::Grayscale, png::BitDepth::Eight) => {
            buf.iter().flat_map(|&g| [g, g, g, 255]).collect()
        }
        (png::ColorType::GrayscaleAlpha, png::BitDepth::Eight) => buf
            .chunks_exact(2)
            .flat_map(|ga| [ga[0], ga[0], ga[0], ga[1]])
            .collect(),
        (color_type, bit_depth) => {
            return Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: format!("{color_type:?} {bit_depth:?}"),
            });
        }
    };
    Ok(RgbaImage::from_data(info.width, info.height, rgba)?)
}

/// Reads a PNG as a single-channel image.
///
/// Multi-channel sources collapse to their first channel.
///
/// # Errors
///
/// Returns [`IoError::UnsupportedFormat`] for bit depths other than eight.
pub fn read_gray<P: AsRef<Path>>(path: P) -> IoResult<GrayImage> {
    let path = path.as_ref();
    let (info, buf) = decode(path)?;
    trace!(path = %path.display(), ?info.color_type, "read_gray");

    let gray: Vec<u8> = match (info.color_type, info.bit_depth) {
        (png::ColorType::Grayscale, png::BitDepth::Eight) => buf,
        (png::ColorType::GrayscaleAlpha, png::BitDepth::Eight) => {
            buf.chunks_exact(2).map(|ga| ga[0]).collect()
        }
        (png::ColorType::Rgb, png::BitDepth::Eight) => {
            buf.chunks_exact(3).map(|px| px[0]).collect()
        }
        (png::ColorType::Rgba, png::BitDepth::Eight) => {
            buf.chunks_exact(4).map(|px| px[0]).collect()
        }
        (color_type, bit_depth) => {
            return Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: format!("{color_type:?} {bit_depth:?}"),
            });
        }
    };
    Ok(GrayImage::from_data(info.width, info.height, gray)?)
}

fn encode(
    path: &Path,
    width: u32,
    height: u32,
    color: png::ColorType,
    compression: Compression,
    data: &[u8],
) -> IoResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(compression.to_png());
    let mut png_writer = encoder.write_header().map_err(|e| IoError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    png_writer.write_image_data(data).map_err(|e| IoError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Writes an RGBA image as a PNG.
pub fn write_rgba<P: AsRef<Path>>(
    path: P,
    image: &RgbaImage,
    compression: Compression,
) -> IoResult<()> {
    let path = path.as_ref();
    trace!(path = %path.display(), "write_rgba");
    encode(
        path,
        image.width(),
        image.height(),
        png::ColorType::Rgba,
        compression,
        image.data(),
    )
}

/// Writes a single-channel image as a grayscale PNG.
pub fn write_gray<P: AsRef<Path>>(
    path: P,
    image: &GrayImage,
    compression: Compression,
) -> IoResult<()> {
    let path = path.as_ref();
    trace!(path = %path.display(), "write_gray");
    encode(
        path,
        image.width(),
        image.height(),
        png::ColorType::Grayscale,
        compression,
        image.data(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rt.png");
        let mut img = RgbaImage::filled(9, 7, [10, 20, 30, 255]);
        img.set_pixel(3, 2, [200, 100, 0, 40]);
        write_rgba(&path, &img, Compression::Default).unwrap();
        let back = read_rgba(&path).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn gray_round_trip_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.png");
        let mut map = GrayImage::new(5, 5);
        map.set_sample(4, 4, 99);
        write_gray(&path, &map, Compression::Fast).unwrap();
        assert_eq!(read_gray(&path).unwrap(), map);
    }

    #[test]
    fn gray_file_promotes_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        write_gray(&path, &GrayImage::filled(4, 4, 80), Compression::Default).unwrap();
        let rgba = read_rgba(&path).unwrap();
        assert_eq!(rgba.pixel(0, 0), [80, 80, 80, 255]);
    }

    #[test]
    fn rgba_file_collapses_to_gray() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        write_rgba(&path, &RgbaImage::filled(4, 4, [7, 8, 9, 255]), Compression::Default).unwrap();
        let gray = read_gray(&path).unwrap();
        assert_eq!(gray.sample(0, 0), 7);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_rgba("/nonexistent/nope.png").unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }
}
