//! File naming conventions.
//!
//! Layer revisions use a `_vN` suffix: `slice.png` is version 1,
//! `slice_v2.png` the second revision, and so on. Side files derive from
//! the revision they belong to: `slice_v2_depth.png` holds the cleaned
//! depth texture, `slice_v2_upscaled.png` a super-resolved variant that the
//! exporter prefers when present. Directory components are preserved
//! throughout.

use std::path::{Path, PathBuf};

/// Returns the next revision path for a layer file.
///
/// `image.png` becomes `image_v2.png`; `image_v2.png` becomes
/// `image_v3.png`. The directory and extension are preserved.
pub fn filename_add_version(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".into());

    let (base, version) = split_version(&stem);
    let next = version.unwrap_or(1) + 1;
    path.with_file_name(format!("{base}_v{next}.{ext}"))
}

/// Splits `name_vN` into `(name, Some(N))`, or returns the input unchanged.
fn split_version(stem: &str) -> (&str, Option<u32>) {
    if let Some(pos) = stem.rfind("_v") {
        let digits = &stem[pos + 2..];
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(version) = digits.parse::<u32>() {
                return (&stem[..pos], Some(version));
            }
        }
    }
    (stem, None)
}

/// Depth side file for a layer revision: `<stem>_depth.png`.
pub fn depth_filename(path: &Path) -> PathBuf {
    sibling(path, "_depth")
}

/// Upscaled-texture side file for a layer revision: `<stem>_upscaled.png`.
pub fn upscaled_filename(path: &Path) -> PathBuf {
    sibling(path, "_upscaled")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}.png"))
}
