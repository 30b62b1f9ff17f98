//! The editor engine seam.
//!
//! ## Learning: Traits as Boundaries
//!
//! The session never touches text directly. It talks to whatever engine
//! is bound to a document through `EditorEngine`: it asks for the text
//! when saving, forwards undo/redo, and reads capability and dirty flags.
//! Everything else (typing, rendering, highlighting) happens inside the
//! engine and reaches the session only as a change notification.

use quire_buffer::{BufferError, TextBuffer};
use tokio::sync::watch;

use crate::config::Config;

/// Options used when an engine is created for a newly opened document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum number of undo steps to keep
    pub history_limit: usize,
}

impl EngineOptions {
    /// Derives engine options from the session configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            history_limit: config.editor.undo_limit,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            history_limit: quire_buffer::DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// An editor engine bound to one open document.
///
/// The engine owns the text, the undo history and the dirty state.
/// Undo and redo past the end of history are not errors: they report
/// `false` and change nothing.
pub trait EditorEngine {
    /// Creates a clean engine holding the on-disk `text`.
    fn from_text(text: &str, options: &EngineOptions) -> Self
    where
        Self: Sized;

    /// Returns the full current text.
    fn text(&self) -> String;

    /// Replaces the full text.
    fn set_text(&mut self, text: &str);

    /// Steps back one edit. Returns false when there is nothing to undo.
    fn undo(&mut self) -> bool;

    /// Steps forward one edit. Returns false when there is nothing to redo.
    fn redo(&mut self) -> bool;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Returns true while the text differs from what was last saved.
    fn is_dirty(&self) -> bool;

    /// Returns the current edit revision.
    fn revision(&self) -> u64;

    /// Told after `revision` has been written to disk.
    ///
    /// The engine decides whether that makes it clean; edits made after
    /// the snapshot keep it dirty.
    fn mark_saved(&mut self, revision: u64);

    /// Subscribes to change notifications, one value per revision.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

impl EditorEngine for TextBuffer {
    fn from_text(text: &str, options: &EngineOptions) -> Self {
        TextBuffer::with_history_limit(text, options.history_limit)
    }

    fn text(&self) -> String {
        TextBuffer::text(self).into_owned()
    }

    fn set_text(&mut self, text: &str) {
        TextBuffer::set_text(self, text);
    }

    fn undo(&mut self) -> bool {
        match TextBuffer::undo(self) {
            Ok(()) => true,
            Err(BufferError::NothingToUndo) => false,
            Err(err) => {
                tracing::warn!("Undo failed: {}", err);
                false
            }
        }
    }

    fn redo(&mut self) -> bool {
        match TextBuffer::redo(self) {
            Ok(()) => true,
            Err(BufferError::NothingToRedo) => false,
            Err(err) => {
                tracing::warn!("Redo failed: {}", err);
                false
            }
        }
    }

    fn can_undo(&self) -> bool {
        TextBuffer::can_undo(self)
    }

    fn can_redo(&self) -> bool {
        TextBuffer::can_redo(self)
    }

    fn is_dirty(&self) -> bool {
        self.is_modified()
    }

    fn revision(&self) -> u64 {
        TextBuffer::revision(self)
    }

    fn mark_saved(&mut self, revision: u64) {
        if !TextBuffer::mark_saved(self, revision) {
            tracing::debug!(
                "Buffer moved past saved revision {} (now {}), staying dirty",
                revision,
                TextBuffer::revision(self)
            );
        }
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        TextBuffer::subscribe(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let mut engine = TextBuffer::from_text("abc", &EngineOptions::default());
        assert!(!EditorEngine::undo(&mut engine));
        assert!(!EditorEngine::redo(&mut engine));
        assert_eq!(EditorEngine::text(&engine), "abc");
        assert!(!engine.is_dirty());
    }

    #[test]
    fn test_history_limit_from_options() {
        let options = EngineOptions { history_limit: 1 };
        let mut engine = TextBuffer::from_text("", &options);
        engine.insert(0, "a\n").unwrap();
        engine.insert(2, "b\n").unwrap();

        assert!(EditorEngine::undo(&mut engine));
        assert!(!EditorEngine::undo(&mut engine));
        assert_eq!(EditorEngine::text(&engine), "a\n");
    }

    #[test]
    fn test_mark_saved_cleans_current_revision() {
        let mut engine = TextBuffer::from_text("abc", &EngineOptions::default());
        EditorEngine::set_text(&mut engine, "abcd");
        assert!(engine.is_dirty());

        let rev = EditorEngine::revision(&engine);
        EditorEngine::mark_saved(&mut engine, rev);
        assert!(!engine.is_dirty());
    }

    #[test]
    fn test_options_follow_config() {
        let mut config = Config::default();
        config.editor.undo_limit = 7;
        assert_eq!(EngineOptions::from_config(&config).history_limit, 7);
    }
}
