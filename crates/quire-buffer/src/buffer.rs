//! Core text buffer implementation using rope data structure.
//!
//! ## Why Rope?
//!
//! Ropes keep insertions and deletions at O(log n) regardless of where
//! they happen, which matters once files grow past a few thousand lines.
//!
//! ## Revisions
//!
//! Every mutation (edit, undo, redo, whole-text replacement) bumps a
//! monotonically increasing revision, published on a `watch` channel so
//! observers can react to changes they did not initiate.
//!
//! Dirtiness is not a revision comparison. Saving records the history
//! state the text was in, and the buffer is clean exactly when the history
//! is back in that state, so undoing to the saved text clears the flag.

use ropey::Rope;
use std::ops::Range;
use tokio::sync::watch;

use crate::history::{Edit, EditKind, History};
use crate::{BufferError, BufferResult};

/// Default number of undo groups kept per buffer.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// A text buffer backed by a rope data structure.
///
/// # Thread Safety
///
/// `TextBuffer` is `Send` but is meant to be mutated from one task only.
/// Other tasks observe it through [`TextBuffer::subscribe`].
#[derive(Debug)]
pub struct TextBuffer {
    /// The rope holding our text content
    rope: Rope,

    /// Edit history for undo/redo
    history: History,

    /// Bumped by every mutation
    revision: u64,

    /// History state last persisted
    saved_state: u64,

    /// Publishes `revision` after each mutation
    changes: watch::Sender<u64>,
}

impl TextBuffer {
    /// Creates a new empty buffer.
    ///
    /// # Example
    /// ```
    /// use quire_buffer::TextBuffer;
    ///
    /// let buffer = TextBuffer::new();
    /// assert!(buffer.is_empty());
    /// assert!(!buffer.is_modified());
    /// ```
    pub fn new() -> Self {
        Self::with_history_limit("", DEFAULT_HISTORY_LIMIT)
    }

    /// Creates a clean buffer holding `text` with a bounded undo history.
    pub fn with_history_limit(text: &str, history_limit: usize) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            rope: Rope::from_str(text),
            history: History::new(history_limit),
            revision: 0,
            saved_state: 0,
            changes,
        }
    }

    // ==================== Text Access ====================

    /// Returns the entire text content as a `Cow<str>`.
    ///
    /// # Learning: Cow (Clone-on-Write)
    ///
    /// Borrowed when the rope is a single chunk, allocated otherwise.
    #[inline]
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        self.rope.slice(..).into()
    }

    // ==================== Measurements ====================

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Returns the number of characters in the buffer.
    #[inline]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the number of lines in the buffer.
    ///
    /// An empty buffer has 1 line.
    #[inline]
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    // ==================== Mutations ====================

    /// Inserts text at a character index.
    ///
    /// # Learning: `&mut self`
    ///
    /// The borrow checker guarantees nobody else reads or writes the
    /// buffer while this runs.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> BufferResult<()> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }
        if text.is_empty() {
            return Ok(());
        }

        self.history.push(Edit::insert(char_idx, text));
        self.rope.insert(char_idx, text);
        self.bump_revision();

        Ok(())
    }

    /// Deletes text in a character range, returning the removed text.
    pub fn delete(&mut self, range: Range<usize>) -> BufferResult<String> {
        if range.start > range.end || range.end > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(range.end));
        }
        if range.is_empty() {
            return Ok(String::new());
        }

        let deleted: String = self.rope.slice(range.clone()).into();
        self.history.push(Edit::delete(range.start, deleted.clone()));
        self.rope.remove(range);
        self.bump_revision();

        Ok(deleted)
    }

    /// Replaces text in a range as a single undo step.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> BufferResult<String> {
        self.history.begin_group();
        let result = self
            .delete(range.clone())
            .and_then(|deleted| self.insert(range.start, text).map(|()| deleted));
        self.history.end_group();
        result
    }

    /// Replaces the whole content as a single undo step.
    pub fn set_text(&mut self, text: &str) {
        if self.text() == text {
            return;
        }
        let len = self.len_chars();
        // The full range is always valid
        let _ = self.replace(0..len, text);
    }

    // ==================== Undo/Redo ====================

    /// Undoes the last edit group.
    ///
    /// Returns [`BufferError::NothingToUndo`] when the history is empty.
    pub fn undo(&mut self) -> BufferResult<()> {
        let edits = self.history.undo().ok_or(BufferError::NothingToUndo)?;

        // Revert back to front, without recording to history
        for edit in edits.iter().rev() {
            self.apply(&edit.inverse());
        }

        self.bump_revision();
        Ok(())
    }

    /// Redoes the last undone edit group.
    pub fn redo(&mut self) -> BufferResult<()> {
        let edits = self.history.redo().ok_or(BufferError::NothingToRedo)?;

        for edit in &edits {
            self.apply(edit);
        }

        self.bump_revision();
        Ok(())
    }

    fn apply(&mut self, edit: &Edit) {
        match edit.kind {
            EditKind::Insert => self.rope.insert(edit.position, &edit.content),
            EditKind::Delete => {
                let end = edit.position + edit.char_len();
                self.rope.remove(edit.position..end);
            }
        }
    }

    /// Returns true if there are edits to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns true if there are edits to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ==================== Revisions ====================

    fn bump_revision(&mut self) {
        self.revision += 1;
        self.changes.send_replace(self.revision);
    }

    /// Returns the current revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns true if the text differs from the last saved state.
    pub fn is_modified(&self) -> bool {
        self.history.state() != self.saved_state
    }

    /// Records that the text at `revision` has been persisted.
    ///
    /// Returns false, leaving the buffer dirty, when the buffer has moved
    /// past `revision` since the snapshot was taken.
    pub fn mark_saved(&mut self, revision: u64) -> bool {
        if revision != self.revision {
            return false;
        }
        let was_modified = self.is_modified();
        self.saved_state = self.history.state();
        if was_modified {
            // Dirty state changed without a text change; still a notification
            self.changes.send_replace(self.revision);
        }
        true
    }

    /// Subscribes to revision changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self::with_history_limit(s, DEFAULT_HISTORY_LIMIT)
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn undo_everything_restores_original(
            ops in proptest::collection::vec((0usize..64, "[a-z\\n]{1,4}"), 1..24)
        ) {
            let mut buffer = TextBuffer::from("seed");
            for (pos, text) in ops {
                let at = pos.min(buffer.len_chars());
                buffer.insert(at, &text).unwrap();
            }
            while buffer.can_undo() {
                buffer.undo().unwrap();
            }
            prop_assert_eq!(buffer.text(), "seed");
        }
    }

    #[test]
    fn test_fresh_buffer_is_clean() {
        let buffer = TextBuffer::from("hello");
        assert!(!buffer.is_modified());
        assert!(!buffer.can_undo());
        assert_eq!(buffer.revision(), 0);
    }

    #[test]
    fn test_edit_marks_dirty_and_save_clears() {
        let mut buffer = TextBuffer::from("hello");
        buffer.insert(5, "!").unwrap();
        assert!(buffer.is_modified());

        let rev = buffer.revision();
        assert!(buffer.mark_saved(rev));
        assert!(!buffer.is_modified());
    }

    #[test]
    fn test_stale_save_keeps_dirty() {
        let mut buffer = TextBuffer::from("hello");
        buffer.insert(0, "a").unwrap();
        let snapshot = buffer.revision();
        buffer.insert(1, "\n").unwrap();

        assert!(!buffer.mark_saved(snapshot));
        assert!(buffer.is_modified());
    }

    #[test]
    fn test_set_text_is_one_undo_step() {
        let mut buffer = TextBuffer::from("old contents");
        buffer.set_text("new");
        assert_eq!(buffer.text(), "new");

        buffer.undo().unwrap();
        assert_eq!(buffer.text(), "old contents");

        buffer.redo().unwrap();
        assert_eq!(buffer.text(), "new");
    }

    #[test]
    fn test_set_same_text_is_noop() {
        let mut buffer = TextBuffer::from("same");
        buffer.set_text("same");
        assert_eq!(buffer.revision(), 0);
        assert!(!buffer.can_undo());
    }

    #[test]
    fn test_empty_history_errors() {
        let mut buffer = TextBuffer::new();
        assert!(matches!(buffer.undo(), Err(BufferError::NothingToUndo)));
        assert!(matches!(buffer.redo(), Err(BufferError::NothingToRedo)));
        assert_eq!(buffer.revision(), 0);
    }

    #[test]
    fn test_subscribe_sees_revisions() {
        let mut buffer = TextBuffer::new();
        let mut rx = buffer.subscribe();
        assert!(!rx.has_changed().unwrap());

        buffer.insert(0, "x").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
    }

    #[test]
    fn test_undo_to_saved_text_is_clean() {
        let mut buffer = TextBuffer::from("alpha");
        buffer.set_text("beta");
        assert!(buffer.is_modified());

        buffer.undo().unwrap();
        assert_eq!(buffer.text(), "alpha");
        assert!(!buffer.is_modified());

        buffer.redo().unwrap();
        assert!(buffer.is_modified());
    }

    #[test]
    fn test_save_then_undo_and_redo() {
        let mut buffer = TextBuffer::from("one");
        buffer.set_text("two");
        assert!(buffer.mark_saved(buffer.revision()));

        buffer.undo().unwrap();
        assert_eq!(buffer.text(), "one");
        assert!(buffer.is_modified());

        buffer.redo().unwrap();
        assert_eq!(buffer.text(), "two");
        assert!(!buffer.is_modified());
    }

    #[test]
    fn test_typing_after_save_is_dirty() {
        let mut buffer = TextBuffer::new();
        buffer.insert(0, "a").unwrap();
        assert!(buffer.mark_saved(buffer.revision()));

        // Coalesces into the saved group, yet the text moved on
        buffer.insert(1, "b").unwrap();
        assert!(buffer.is_modified());
    }
}
