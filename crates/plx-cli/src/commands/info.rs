//! `plx info` - print a session summary.

use crate::InfoArgs;
use anyhow::Result;

pub fn run(args: InfoArgs) -> Result<()> {
    let session = super::load_session(&args.session)?;

    match &session.source {
        Some(source) => println!(
            "Source: {}x{}  bands: {}",
            source.width(),
            source.height(),
            session.band_count()
        ),
        None => println!("Source: none  bands: {}", session.band_count()),
    }
    if let Some(thresholds) = session.thresholds() {
        println!("Thresholds: {:?}", thresholds.boundaries());
    }

    println!("{:<5} {:<28} {:>5} {:>10} {:>6}", "idx", "file", "depth", "revisions", "undo");
    for (i, layer) in session.layers().iter().enumerate() {
        let undo = match (session.can_undo(i, false), session.can_undo(i, true)) {
            (true, true) => "<->",
            (true, false) => "<-",
            (false, true) => "->",
            (false, false) => "-",
        };
        println!(
            "{:<5} {:<28} {:>5} {:>10} {:>6}",
            i,
            layer.file().display(),
            layer.depth,
            layer.revisions().len(),
            undo
        );
    }
    Ok(())
}
