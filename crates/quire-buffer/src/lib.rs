//! # Quire Buffer
//!
//! Rope-backed text buffer used as the default editor engine.
//!
//! ## Key Concepts
//!
//! ### Ownership & Borrowing
//! - `TextBuffer` owns the rope and its undo history
//! - `text()` borrows where it can and only allocates for multi-chunk ropes
//! - Mutations require `&mut self` (exclusive access)
//!
//! ### Dirty Tracking
//! - Every mutation bumps a revision, published on a `tokio::sync::watch` channel
//! - Saving records the current history state
//! - The buffer is dirty while the history is in any other state

mod buffer;
mod history;

pub use buffer::{TextBuffer, DEFAULT_HISTORY_LIMIT};
pub use history::{Edit, EditKind, History};

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Invalid character index: {0}")]
    InvalidCharIndex(usize),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}
