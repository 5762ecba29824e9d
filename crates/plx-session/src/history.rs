//! Per-layer revision history.
//!
//! A [`RevisionLog`] is a linear log of file identities with a cursor at the
//! live revision. Recording after an undo truncates the now-unreachable
//! forward entries (standard editor semantics). The log never touches the
//! files themselves: revisions stay on disk even when the cursor moves away
//! from them, so undo is always reversible until the next edit.

use std::path::{Path, PathBuf};

/// Linear undo/redo log over file identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionLog {
    entries: Vec<PathBuf>,
    cursor: usize,
}

impl RevisionLog {
    /// Creates a log with a single initial revision.
    pub fn new(initial: PathBuf) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    /// Rebuilds a log from stored parts.
    ///
    /// Returns `None` if `entries` is empty or `cursor` is out of range.
    pub fn from_parts(entries: Vec<PathBuf>, cursor: usize) -> Option<Self> {
        if entries.is_empty() || cursor >= entries.len() {
            return None;
        }
        Some(Self { entries, cursor })
    }

    /// The live revision's file identity.
    pub fn current(&self) -> &Path {
        &self.entries[self.cursor]
    }

    /// All recorded identities, oldest first.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Cursor position within [`Self::entries`].
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of recorded revisions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; a log holds at least its initial revision.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Records a new revision and makes it current.
    ///
    /// Entries beyond the cursor (skipped redo states) are dropped from the
    /// log; their files stay on disk.
    pub fn record(&mut self, path: PathBuf) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(path);
        self.cursor += 1;
    }

    /// Whether a step backward (`forward == false`) or forward is possible.
    pub fn can_step(&self, forward: bool) -> bool {
        if forward {
            self.cursor + 1 < self.entries.len()
        } else {
            self.cursor > 0
        }
    }

    /// Moves the cursor one step; returns `false` at a boundary.
    ///
    /// A `false` return leaves the log unchanged - a no-op, not an error.
    pub fn step(&mut self, forward: bool) -> bool {
        if !self.can_step(forward) {
            return false;
        }
        if forward {
            self.cursor += 1;
        } else {
            self.cursor -= 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> RevisionLog {
        let mut log = RevisionLog::new(PathBuf::from("slice.png"));
        log.record(PathBuf::from("slice_v2.png"));
        log.record(PathBuf::from("slice_v3.png"));
        log
    }

    #[test]
    fn record_advances_current() {
        let log = log();
        assert_eq!(log.current(), Path::new("slice_v3.png"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut log = log();
        assert!(log.step(false));
        assert_eq!(log.current(), Path::new("slice_v2.png"));
        assert!(log.step(true));
        assert_eq!(log.current(), Path::new("slice_v3.png"));
    }

    #[test]
    fn undo_at_start_is_noop() {
        let mut log = RevisionLog::new(PathBuf::from("slice.png"));
        assert!(!log.step(false));
        assert_eq!(log.current(), Path::new("slice.png"));
        assert!(!log.can_step(false));
        assert!(!log.can_step(true));
    }

    #[test]
    fn redo_only_after_undo() {
        let mut log = log();
        assert!(!log.can_step(true));
        log.step(false);
        assert!(log.can_step(true));
    }

    #[test]
    fn new_edit_truncates_forward_history() {
        let mut log = log();
        log.step(false); // back to v2
        log.record(PathBuf::from("slice_v4.png"));
        // The skipped v3 entry is unreachable now.
        assert!(!log.can_step(true));
        assert_eq!(
            log.entries(),
            &[
                PathBuf::from("slice.png"),
                PathBuf::from("slice_v2.png"),
                PathBuf::from("slice_v4.png"),
            ]
        );
    }

    #[test]
    fn from_parts_validates() {
        assert!(RevisionLog::from_parts(vec![], 0).is_none());
        assert!(RevisionLog::from_parts(vec![PathBuf::from("a.png")], 1).is_none());
        let log = RevisionLog::from_parts(
            vec![PathBuf::from("a.png"), PathBuf::from("a_v2.png")],
            0,
        )
        .unwrap();
        assert_eq!(log.current(), Path::new("a.png"));
        assert!(log.can_step(true));
    }
}
