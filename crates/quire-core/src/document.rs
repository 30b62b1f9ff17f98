//! Document handles.
//!
//! ## Learning: Type Aliases and Newtypes
//!
//! `DocumentId` is a newtype wrapper around `Uuid`. This provides:
//! - Type safety: Can't accidentally pass a tab index where an ID is expected
//! - Stability: an ID survives tab reordering, an index does not
//! - Documentation: The type name explains its purpose

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use uuid::Uuid;

use crate::engine::EditorEngine;
use crate::session::DocumentTab;

/// Unique identifier for an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One open file and the editor engine bound to it.
///
/// ## Learning: Composition over Inheritance
///
/// The handle does not know how text is stored or how undo works. It
/// composes an engine `E` and only adds identity. The dirty flag is always
/// read from the engine, never cached here.
pub struct DocumentHandle<E> {
    /// Unique identifier
    id: DocumentId,

    /// Backing file
    path: PathBuf,

    /// Display name
    name: String,

    /// The bound editor engine; dropped with the handle
    engine: E,

    /// Engine revision notifications
    changes: watch::Receiver<u64>,
}

impl<E: EditorEngine> DocumentHandle<E> {
    /// Binds `engine` to `path`.
    pub fn new(path: impl Into<PathBuf>, engine: E) -> Self {
        let path = path.into();
        let name = display_name(&path);
        let mut changes = engine.subscribe();
        let _ = changes.borrow_and_update();

        Self {
            id: DocumentId::new(),
            path,
            name,
            engine,
            changes,
        }
    }

    // ==================== Getters ====================

    /// Returns the document ID.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the engine holds unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.engine.is_dirty()
    }

    /// Returns the bound engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns a mutable reference to the bound engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Returns the read-only tab view of this handle.
    pub fn tab(&self) -> DocumentTab {
        DocumentTab {
            id: self.id,
            path: self.path.clone(),
            name: self.name.clone(),
            dirty: self.is_dirty(),
        }
    }

    // ==================== Change Tracking ====================

    /// Returns true once per batch of engine changes since the last call.
    pub(crate) fn take_change(&mut self) -> bool {
        match self.changes.has_changed() {
            Ok(true) => {
                let _ = self.changes.borrow_and_update();
                true
            }
            _ => false,
        }
    }

    /// Marks all pending engine changes as seen.
    pub(crate) fn mark_seen(&mut self) {
        let _ = self.changes.borrow_and_update();
    }

    /// Waits for the next engine change.
    ///
    /// Never resolves if the engine stopped publishing.
    pub(crate) async fn changed(&mut self) {
        if self.changes.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl<E> std::fmt::Debug for DocumentHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// File name of `path`, or the whole path when it has none.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use quire_buffer::TextBuffer;

    fn handle(path: &str, text: &str) -> DocumentHandle<TextBuffer> {
        DocumentHandle::new(path, TextBuffer::from_text(text, &EngineOptions::default()))
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(handle("/project/src/main.rs", "").name(), "main.rs");
        assert_eq!(handle("/", "").name(), "/");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = handle("/p/a.txt", "");
        let b = handle("/p/a.txt", "");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_dirty_comes_from_engine() {
        let mut doc = handle("/p/a.txt", "abc");
        assert!(!doc.is_dirty());
        assert!(!doc.tab().dirty);

        doc.engine_mut().set_text("changed");
        assert!(doc.is_dirty());
        assert!(doc.tab().dirty);
    }

    #[test]
    fn test_take_change_fires_once() {
        let mut doc = handle("/p/a.txt", "abc");
        assert!(!doc.take_change());

        doc.engine_mut().set_text("x");
        assert!(doc.take_change());
        assert!(!doc.take_change());
    }
}
