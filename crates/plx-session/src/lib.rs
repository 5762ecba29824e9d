//! # plx-session
//!
//! The editing session: an ordered stack of depth-sorted layers with
//! per-layer linear undo/redo over versioned files, plus the orchestration
//! that turns a session into a glTF scene or a rendered dolly animation.
//!
//! Sessions are plain values; there is no process-wide registry. Callers
//! hold a [`Session`], persist it through a [`SessionStore`], and pass it by
//! reference into the pipelines. One session is single-writer: callers
//! serialize edits per session.
//!
//! # Modules
//!
//! - [`naming`] - versioned-filename and side-file conventions
//! - [`history`] - per-layer revision log
//! - [`layer`] - layer value type
//! - [`session`] - the layer stack and its operations
//! - [`store`] - persistence trait and filesystem implementation
//! - [`pipeline`] - export and animation orchestration

#![warn(missing_docs)]

mod error;
pub mod history;
pub mod layer;
pub mod naming;
pub mod pipeline;
pub mod session;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use layer::Layer;
pub use session::{Session, ThresholdOutcome};
pub use store::{FsSessionStore, SessionStore};
