//! `plx export` - write the glTF scene for a session.

use crate::ExportArgs;
use anyhow::{Context, Result};
use plx_scene::CameraParams;
use plx_session::pipeline::{self, ExportOptions};

pub fn run(args: ExportArgs) -> Result<()> {
    let session = super::load_session(&args.session)?;

    let opts = ExportOptions {
        camera: CameraParams::new(args.focal_length, args.camera_distance, args.max_distance),
        displacement_scale: args.displacement,
        support_depth_of_field: args.dof,
    };
    // The CLI carries no depth model; displacement relies on precomputed
    // <slice>_depth.png side files.
    let path = pipeline::export_gltf(&session, &args.session, &opts, None)
        .context("Export failed")?;

    println!("Scene written to {}", path.display());
    Ok(())
}
