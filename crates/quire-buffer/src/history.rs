//! Undo/redo history management.
//!
//! ## Learning: The Command Pattern
//!
//! Each edit is stored as a command that can be:
//! - Executed (applied to the buffer)
//! - Undone (reversed)
//! - Redone (re-applied after undo)
//!
//! Edits are collected into groups. One undo or redo step always moves a
//! whole group, so a compound operation such as "replace the whole text"
//! is reverted in one step.
//!
//! ## History States
//!
//! Every group carries an ID naming the text state reached after applying
//! it. [`History::state`] is the ID of the group on top of the undo stack,
//! so undoing back to an earlier point yields that point's ID again. IDs
//! are never reused, which lets the buffer compare "where we are" against
//! "where we saved" without looking at the text.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// The type of edit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    /// Text was inserted
    Insert,
    /// Text was deleted
    Delete,
}

/// A single edit operation.
///
/// ## Learning: Clone vs Copy
///
/// `Edit` implements `Clone` but not `Copy` because it contains
/// a `String`, which owns heap memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// What kind of edit this is
    pub kind: EditKind,
    /// Character position where the edit occurred
    pub position: usize,
    /// The text that was inserted or deleted
    pub content: String,
}

impl Edit {
    /// Creates an insert edit.
    pub fn insert(position: usize, content: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Insert,
            position,
            content: content.into(),
        }
    }

    /// Creates a delete edit.
    pub fn delete(position: usize, content: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Delete,
            position,
            content: content.into(),
        }
    }

    /// Returns the inverse of this edit (for undo).
    pub fn inverse(&self) -> Self {
        Self {
            kind: match self.kind {
                EditKind::Insert => EditKind::Delete,
                EditKind::Delete => EditKind::Insert,
            },
            position: self.position,
            content: self.content.clone(),
        }
    }

    /// Number of characters covered by the edit.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Returns true if `other` directly continues this edit.
    ///
    /// Inserts continue when typed right after each other, deletes when
    /// they are a backspace run or a forward-delete run. Newlines always
    /// start a new step.
    pub fn can_coalesce(&self, other: &Edit) -> bool {
        if self.kind != other.kind {
            return false;
        }

        if self.content.contains('\n') || other.content.contains('\n') {
            return false;
        }

        match self.kind {
            EditKind::Insert => self.position + self.char_len() == other.position,
            EditKind::Delete => {
                other.position + other.char_len() == self.position
                    || self.position == other.position
            }
        }
    }

    /// Coalesces another edit into this one.
    pub fn coalesce(&mut self, other: Edit) {
        match self.kind {
            EditKind::Insert => {
                self.content.push_str(&other.content);
            }
            EditKind::Delete => {
                if other.position < self.position {
                    // Backspace: prepend
                    self.content = other.content + &self.content;
                    self.position = other.position;
                } else {
                    self.content.push_str(&other.content);
                }
            }
        }
    }
}

/// A group of edits that are undone/redone together.
#[derive(Debug, Clone)]
pub struct EditGroup {
    /// The edits in application order
    pub edits: Vec<Edit>,
    /// State reached after applying the group
    id: u64,
    /// Last time the group was extended; `None` blocks coalescing
    timestamp: Option<Instant>,
}

impl EditGroup {
    fn new(id: u64, edit: Edit) -> Self {
        Self {
            edits: vec![edit],
            id,
            timestamp: Some(Instant::now()),
        }
    }

    fn sealed(id: u64, edits: Vec<Edit>) -> Self {
        Self {
            edits,
            id,
            timestamp: None,
        }
    }
}

/// Manages undo/redo history.
///
/// ## Design Decisions
///
/// 1. **Bounded history**: the oldest group is dropped at capacity
/// 2. **Edit coalescing**: rapid adjacent keystrokes share one group
/// 3. **Explicit grouping**: `begin_group`/`end_group` bracket compound edits
///
/// ## Learning: VecDeque
///
/// `VecDeque` gives cheap push/pop at the back (new edits, undo) and
/// cheap pop at the front (evicting the oldest group).
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<EditGroup>,
    redo_stack: Vec<EditGroup>,
    max_size: usize,
    coalesce_threshold: Duration,
    /// Edits collected while a group is open
    open_group: Option<Vec<Edit>>,
    /// State below the oldest kept group
    base_state: u64,
    /// Next unused state ID
    next_state: u64,
}

impl History {
    /// Creates a new history with the given capacity.
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_size.min(1024)),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
            coalesce_threshold: Duration::from_millis(300),
            open_group: None,
            base_state: 0,
            next_state: 1,
        }
    }

    fn fresh_state(&mut self) -> u64 {
        let id = self.next_state;
        self.next_state += 1;
        id
    }

    /// Returns the ID of the current text state.
    ///
    /// A fresh history is in state 0.
    pub fn state(&self) -> u64 {
        self.undo_stack.back().map_or(self.base_state, |g| g.id)
    }

    /// Pushes an edit onto the history.
    ///
    /// Clears the redo stack and may coalesce with the previous edit.
    pub fn push(&mut self, edit: Edit) {
        self.redo_stack.clear();

        if let Some(group) = self.open_group.as_mut() {
            group.push(edit);
            return;
        }

        if let Some(last_group) = self.undo_stack.back_mut() {
            let fresh = last_group
                .timestamp
                .is_some_and(|t| t.elapsed() < self.coalesce_threshold);

            if fresh && last_group.edits.len() == 1 {
                if let Some(last_edit) = last_group.edits.last_mut() {
                    if last_edit.can_coalesce(&edit) {
                        last_edit.coalesce(edit);
                        // The extended group reaches a new state
                        last_group.id = self.next_state;
                        self.next_state += 1;
                        last_group.timestamp = Some(Instant::now());
                        return;
                    }
                }
            }
        }

        let id = self.fresh_state();
        self.push_group(EditGroup::new(id, edit));
    }

    /// Starts an edit group.
    ///
    /// All edits until `end_group()` will be treated as one undo step.
    pub fn begin_group(&mut self) {
        if self.open_group.is_none() {
            self.open_group = Some(Vec::new());
        }
    }

    /// Ends the current edit group.
    pub fn end_group(&mut self) {
        if let Some(edits) = self.open_group.take() {
            if !edits.is_empty() {
                let id = self.fresh_state();
                self.push_group(EditGroup::sealed(id, edits));
            }
        }
    }

    fn push_group(&mut self, group: EditGroup) {
        self.undo_stack.push_back(group);
        while self.undo_stack.len() > self.max_size {
            if let Some(evicted) = self.undo_stack.pop_front() {
                self.base_state = evicted.id;
            }
        }
    }

    /// Pops the last group for undo.
    ///
    /// Returns the group's edits in application order; the caller reverts
    /// them back to front.
    pub fn undo(&mut self) -> Option<Vec<Edit>> {
        let mut group = self.undo_stack.pop_back()?;
        let edits = group.edits.clone();
        group.timestamp = None;
        self.redo_stack.push(group);
        Some(edits)
    }

    /// Pops the last undone group for redo, in application order.
    pub fn redo(&mut self) -> Option<Vec<Edit>> {
        let group = self.redo_stack.pop()?;
        let edits = group.edits.clone();
        // Already sealed, so the next keystroke does not merge into it
        self.push_group(group);
        Some(edits)
    }

    /// Returns true if there are edits to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are edits to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Returns the number of undo steps available.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_inverse() {
        let insert = Edit::insert(0, "hello");
        let inverse = insert.inverse();

        assert_eq!(inverse.kind, EditKind::Delete);
        assert_eq!(inverse.position, 0);
        assert_eq!(inverse.content, "hello");
    }

    #[test]
    fn test_adjacent_inserts_coalesce() {
        let mut history = History::new(100);
        history.push(Edit::insert(0, "a"));
        history.push(Edit::insert(1, "b"));

        assert_eq!(history.undo_count(), 1);
        let edits = history.undo().unwrap();
        assert_eq!(edits, vec![Edit::insert(0, "ab")]);
    }

    #[test]
    fn test_newline_starts_new_step() {
        let mut history = History::new(100);
        history.push(Edit::insert(0, "a"));
        history.push(Edit::insert(1, "\n"));

        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn test_group_undoes_in_one_step() {
        let mut history = History::new(100);
        history.begin_group();
        history.push(Edit::delete(0, "old"));
        history.push(Edit::insert(0, "new"));
        history.end_group();

        assert_eq!(history.undo_count(), 1);
        let edits = history.undo().unwrap();
        assert_eq!(edits.len(), 2);
        assert!(history.can_redo());

        let redone = history.redo().unwrap();
        assert_eq!(redone, edits);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = History::new(100);
        history.push(Edit::insert(0, "a"));
        history.undo();
        assert!(history.can_redo());

        history.push(Edit::insert(0, "b"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(2);
        history.push(Edit::insert(0, "a\n"));
        history.push(Edit::insert(2, "b\n"));
        history.push(Edit::insert(4, "c\n"));

        assert_eq!(history.undo_count(), 2);
        assert_eq!(history.undo().unwrap()[0].content, "c\n");
        assert_eq!(history.undo().unwrap()[0].content, "b\n");
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_undo_returns_to_previous_state() {
        let mut history = History::new(100);
        assert_eq!(history.state(), 0);

        history.push(Edit::insert(0, "a\n"));
        let first = history.state();
        history.push(Edit::insert(2, "b\n"));
        let second = history.state();
        assert_ne!(first, second);

        history.undo();
        assert_eq!(history.state(), first);
        history.undo();
        assert_eq!(history.state(), 0);
        history.redo();
        history.redo();
        assert_eq!(history.state(), second);
    }

    #[test]
    fn test_coalescing_moves_to_new_state() {
        let mut history = History::new(100);
        history.push(Edit::insert(0, "a"));
        let before = history.state();
        history.push(Edit::insert(1, "b"));

        assert_eq!(history.undo_count(), 1);
        assert_ne!(history.state(), before);
    }

    #[test]
    fn test_branching_never_reuses_state() {
        let mut history = History::new(100);
        history.push(Edit::insert(0, "a\n"));
        let undone = history.state();
        history.undo();
        history.push(Edit::insert(0, "b\n"));
        assert_ne!(history.state(), undone);
    }

    #[test]
    fn test_eviction_keeps_base_state() {
        let mut history = History::new(1);
        history.push(Edit::insert(0, "a\n"));
        let evicted = history.state();
        history.push(Edit::insert(2, "b\n"));

        history.undo();
        assert_eq!(history.state(), evicted);
        assert_ne!(history.state(), 0);
    }
}
