//! plx - turn a photograph plus a depth map into a layered parallax scene
//!
//! The CLI mirror of the interactive editor's pipeline: slice an image into
//! depth layers, export the card stack as a glTF scene, render a dolly
//! preview, inspect a session.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "plx")]
#[command(author, version, about = "Layered parallax scene tool")]
#[command(long_about = "
Turns a single photograph into a layered pseudo-3D scene.

A session directory holds the source image, its depth map, the sliced
layers with their revision history, and the exported artifacts.

Examples:
  plx slice -i photo.png -d depth.png -o mysession -n 4
  plx export mysession --displacement 1.5
  plx animate mysession -o mysession/frames -f 50
  plx info mysession
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Slice an image into depth layers
    #[command(visible_alias = "s")]
    Slice(SliceArgs),

    /// Export a session as a glTF scene
    #[command(visible_alias = "e")]
    Export(ExportArgs),

    /// Render a dolly animation from a session
    #[command(visible_alias = "a")]
    Animate(AnimateArgs),

    /// Show session contents
    #[command(visible_alias = "i")]
    Info(InfoArgs),
}

#[derive(Args)]
struct SliceArgs {
    /// Source photograph
    #[arg(short, long)]
    image: PathBuf,

    /// Depth map (grayscale, same dimensions; larger = farther)
    #[arg(short, long)]
    depth_map: PathBuf,

    /// Session directory to create or overwrite
    #[arg(short, long)]
    output: PathBuf,

    /// Number of depth layers
    #[arg(short = 'n', long, default_value = "5")]
    layers: usize,

    /// Matte expansion in pixels (overlap between adjacent layers)
    #[arg(short, long, default_value = "5")]
    expand: usize,
}

#[derive(Args)]
struct ExportArgs {
    /// Session directory
    session: PathBuf,

    /// Distance from the camera to the nearest card
    #[arg(long, default_value = "10.0")]
    camera_distance: f32,

    /// Distance from the camera to the farthest card
    #[arg(long, default_value = "100.0")]
    max_distance: f32,

    /// Focal length in millimetres (35 mm equivalent)
    #[arg(short, long, default_value = "50.0")]
    focal_length: f32,

    /// Displacement scale; nonzero subdivides cards and displaces vertices.
    /// Requires a <slice>_depth.png next to each layer file.
    #[arg(short, long, default_value = "0.0")]
    displacement: f32,

    /// Record the focus distance on the exported camera
    #[arg(long)]
    dof: bool,
}

#[derive(Args)]
struct AnimateArgs {
    /// Session directory
    session: PathBuf,

    /// Output directory for frames
    #[arg(short, long)]
    output: PathBuf,

    /// Number of frames
    #[arg(short = 'f', long, default_value = "25")]
    frames: usize,

    /// Distance the camera pushes toward the scene
    #[arg(long, default_value = "100.0")]
    push: f32,

    /// Distance from the camera to the nearest card
    #[arg(long, default_value = "100.0")]
    camera_distance: f32,

    /// Distance from the camera to the farthest card
    #[arg(long, default_value = "500.0")]
    max_distance: f32,

    /// Focal length in millimetres (35 mm equivalent)
    #[arg(long, default_value = "100.0")]
    focal_length: f32,
}

#[derive(Args)]
struct InfoArgs {
    /// Session directory
    session: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Slice(args) => commands::slice::run(args),
        Commands::Export(args) => commands::export::run(args),
        Commands::Animate(args) => commands::animate::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
