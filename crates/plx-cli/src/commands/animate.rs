//! `plx animate` - render the dolly preview frames.

use crate::AnimateArgs;
use anyhow::{Context, Result};
use glam::Vec3;
use plx_scene::CameraParams;
use plx_session::pipeline::{self, AnimationOptions};

pub fn run(args: AnimateArgs) -> Result<()> {
    let session = super::load_session(&args.session)?;

    let camera = CameraParams::new(args.focal_length, args.camera_distance, args.max_distance);
    let opts = AnimationOptions {
        camera,
        start_position: Vec3::new(0.0, 0.0, -args.camera_distance),
        push_distance: args.push,
        num_frames: args.frames,
    };
    let frames = pipeline::render_animation(&session, &args.output, &opts)
        .context("Animation render failed")?;

    if frames.is_empty() {
        println!("Nothing to render (no visible layers)");
    } else {
        println!("Wrote {} frames to {}", frames.len(), args.output.display());
    }
    Ok(())
}
