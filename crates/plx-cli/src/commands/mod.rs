//! CLI command implementations

pub mod animate;
pub mod export;
pub mod info;
pub mod slice;

use anyhow::{Context, Result};
use plx_session::{FsSessionStore, Session, SessionStore};
use std::path::Path;

/// Load a session directory.
pub fn load_session(dir: &Path) -> Result<Session> {
    FsSessionStore
        .load(dir)
        .with_context(|| format!("Failed to load session: {}", dir.display()))
}
