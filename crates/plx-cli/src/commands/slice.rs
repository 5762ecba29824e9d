//! `plx slice` - cut a photograph into depth layers.

use crate::SliceArgs;
use anyhow::{bail, Context, Result};
use plx_session::{FsSessionStore, Session, SessionStore};

pub fn run(args: SliceArgs) -> Result<()> {
    if args.layers < 2 {
        bail!("need at least 2 layers, got {}", args.layers);
    }

    let image = plx_io::read_rgba(&args.image)
        .with_context(|| format!("Failed to load image: {}", args.image.display()))?;
    let depth = plx_io::read_gray(&args.depth_map)
        .with_context(|| format!("Failed to load depth map: {}", args.depth_map.display()))?;
    if image.dimensions() != depth.dimensions() {
        bail!(
            "image is {}x{} but depth map is {}x{}",
            image.width(),
            image.height(),
            depth.width(),
            depth.height()
        );
    }

    let mut session = Session::new();
    session.matte_expand = args.expand;
    session.set_source(image);
    session.set_depth_map(depth);
    session.set_band_count(args.layers);
    let count = session.generate_slices()?;

    FsSessionStore
        .save(&session, &args.output)
        .with_context(|| format!("Failed to save session: {}", args.output.display()))?;

    println!(
        "Sliced into {count} layers (thresholds {:?})",
        session.thresholds().map(|t| t.boundaries().to_vec()).unwrap_or_default()
    );
    println!("Session written to {}", args.output.display());
    Ok(())
}
