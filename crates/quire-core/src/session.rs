//! Read-only snapshots of a session.
//!
//! The controller owns the live handles; the presentation layer only ever
//! sees a [`SessionState`], a plain value it can clone, diff or serialize.

use serde::Serialize;
use std::path::PathBuf;

use crate::document::DocumentId;

/// One tab as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentTab {
    pub id: DocumentId,
    pub path: PathBuf,
    pub name: String,
    /// Read from the engine when the snapshot was taken
    pub dirty: bool,
}

/// The two macro-states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// No documents open, nothing selected
    Empty,
    /// At least one document open, exactly one selected
    Active,
}

/// Visibility and enablement of one toolbar action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ToolbarAction {
    pub visible: bool,
    pub enabled: bool,
}

/// Document actions offered by the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Toolbar {
    pub undo: ToolbarAction,
    pub redo: ToolbarAction,
    pub save: ToolbarAction,
    pub more: ToolbarAction,
}

/// Snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Open documents in tab order
    pub documents: Vec<DocumentTab>,

    /// `None` iff `documents` is empty
    pub selected_index: Option<usize>,

    /// Capability of the selected engine at the last observation
    pub can_undo: bool,
    pub can_redo: bool,

    pub more_menu_open: bool,

    /// Selected file name, or the project name when nothing is open
    pub title: String,
}

impl SessionState {
    /// Returns the state of a session with nothing open.
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            documents: Vec::new(),
            selected_index: None,
            can_undo: false,
            can_redo: false,
            more_menu_open: false,
            title: title.into(),
        }
    }

    /// Returns true if at least one document is open.
    pub fn has_open_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    /// Returns the macro-state.
    pub fn phase(&self) -> SessionPhase {
        if self.has_open_documents() {
            SessionPhase::Active
        } else {
            SessionPhase::Empty
        }
    }

    /// Returns the selected tab.
    pub fn selected(&self) -> Option<&DocumentTab> {
        self.selected_index.and_then(|i| self.documents.get(i))
    }

    /// Returns true if any open document is dirty.
    pub fn has_unsaved_changes(&self) -> bool {
        self.documents.iter().any(|d| d.dirty)
    }

    /// Document actions are hidden while the session is empty.
    pub fn toolbar(&self) -> Toolbar {
        let visible = self.has_open_documents();
        let action = |enabled: bool| ToolbarAction {
            visible,
            enabled: visible && enabled,
        };
        Toolbar {
            undo: action(self.can_undo),
            redo: action(self.can_redo),
            save: action(true),
            more: action(true),
        }
    }
}
