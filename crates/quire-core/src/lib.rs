//! # Quire Core
//!
//! Session controller for a multi-document editor workspace.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   SessionController                       │
//! │  ┌──────────────┐ ┌──────────┐ ┌──────────────────────┐  │
//! │  │ ProjectContext│ │  Config  │ │ FileSystem (blocking)│  │
//! │  └──────────────┘ └──────────┘ └──────────────────────┘  │
//! │         │                                                 │
//! │  ┌──────┴───────────────────────────────────┐             │
//! │  │       Open documents (tab order)          │             │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐     │             │
//! │  │  │ Handle 1│ │ Handle 2│ │ Handle 3│     │             │
//! │  │  └─────────┘ └─────────┘ └─────────┘     │             │
//! │  └──────────────────────────────────────────┘             │
//! └──────────────────────────────────────────────────────────┘
//!        ▲ SessionEvent (single slot)      │ SessionState / SessionSignal
//!        │                                 ▼
//!                    presentation layer
//! ```
//!
//! ## Learning: Module Organization
//!
//! Each concern lives in its own module and the public surface is
//! re-exported here, so callers write `quire_core::SessionController`
//! instead of reaching into submodules.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod document;
pub mod engine;
pub mod event;
pub mod fs;
pub mod project;
pub mod session;

use std::path::PathBuf;

pub use config::{Config, ConfigError};
pub use controller::{
    OpenCompletion, OpenOutcome, PendingOpen, PendingSave, SaveCompletion, SaveFailure,
    SaveOutcome, SaveReport, SessionController,
};
pub use dispatch::DispatchOutcome;
pub use document::{DocumentHandle, DocumentId};
pub use engine::{EditorEngine, EngineOptions};
pub use event::{
    event_queue, EventReceiver, EventSender, NotifyLevel, SessionEvent, SessionSignal, SignalBus,
    SignalHandler,
};
pub use fs::{DiskFileSystem, FileSystem, MemoryFileSystem};
pub use project::ProjectContext;
pub use session::{DocumentTab, SessionPhase, SessionState, Toolbar, ToolbarAction};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Reading or writing a backing file failed. Never fatal to the session.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A select/close target outside the open documents.
    #[error("Invalid document index {index} ({len} documents open)")]
    InvalidIndex { index: usize, len: usize },

    #[error("No active document")]
    NoActiveDocument,
}

impl CoreError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the path involved in an I/O failure.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            CoreError::Io { path, .. } => Some(path),
            _ => None,
        }
    }
}
