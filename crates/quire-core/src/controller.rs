//! The session controller.
//!
//! ## Learning: The Facade Pattern
//!
//! `SessionController` is the only type the presentation layer mutates.
//! It owns the open handles and the selection, forwards undo/redo to the
//! selected engine, and moves file contents between engines and disk.
//!
//! ## Learning: Two-Phase I/O
//!
//! Reads and writes run on tokio's blocking pool. Each is started with a
//! `begin_*` call that only borrows the controller, and its result is
//! applied with a `finish_*` call on the owning task. Completions carry
//! enough identity (document ID, session epoch) to be ignored when the
//! document or the session they belonged to is already gone.

use quire_buffer::TextBuffer;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::document::{DocumentHandle, DocumentId};
use crate::engine::{EditorEngine, EngineOptions};
use crate::event::{NotifyLevel, SessionSignal, SignalBus};
use crate::fs::{self, DiskFileSystem, FileSystem};
use crate::project::ProjectContext;
use crate::session::SessionState;
use crate::{CoreError, CoreResult};

/// Result of an open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A new tab was created at this index and selected
    Opened(usize),
    /// The path was already open; its tab was selected
    Selected(usize),
    /// A reserved configuration file; settings navigation was signalled
    ProjectSettings,
    /// The session ended, or the tab to focus was closed, before the
    /// open completed
    Discarded,
}

/// A file read in flight.
pub struct PendingOpen {
    path: PathBuf,
    epoch: u64,
    /// `None` when no read is needed (reserved or already open)
    task: Option<JoinHandle<io::Result<String>>>,
}

/// What the blocking pool produced for an open request.
#[derive(Debug)]
enum ReadResult {
    /// The file was read (or failed to be)
    Read(io::Result<String>),
    /// No read was made; the open may only focus an existing tab
    FocusOnly,
}

impl PendingOpen {
    /// Returns the resolved path being opened.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for the read to finish.
    pub async fn wait(self) -> OpenCompletion {
        let result = match self.task {
            Some(task) => ReadResult::Read(
                task.await.unwrap_or_else(|err| Err(io::Error::other(err))),
            ),
            None => ReadResult::FocusOnly,
        };
        OpenCompletion {
            path: self.path,
            epoch: self.epoch,
            result,
        }
    }
}

/// A finished file read, to be applied with `finish_open`.
#[derive(Debug)]
pub struct OpenCompletion {
    path: PathBuf,
    epoch: u64,
    result: ReadResult,
}

/// Result of a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The document was written to this path
    Saved(PathBuf),
    /// The document was closed while the write was in flight
    Discarded,
}

/// A file write in flight.
pub struct PendingSave {
    id: DocumentId,
    path: PathBuf,
    revision: u64,
    task: JoinHandle<io::Result<()>>,
}

impl PendingSave {
    /// Returns the document being saved.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Waits for the write to finish.
    pub async fn wait(self) -> SaveCompletion {
        let result = self
            .task
            .await
            .unwrap_or_else(|err| Err(io::Error::other(err)));
        SaveCompletion {
            id: self.id,
            path: self.path,
            revision: self.revision,
            result,
        }
    }
}

/// A finished file write, to be applied with `finish_save`.
#[derive(Debug)]
pub struct SaveCompletion {
    id: DocumentId,
    path: PathBuf,
    revision: u64,
    result: io::Result<()>,
}

/// One document that could not be written.
#[derive(Debug)]
pub struct SaveFailure {
    pub path: PathBuf,
    pub error: CoreError,
}

/// Outcome of saving every open document.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<SaveFailure>,
}

impl SaveReport {
    /// Returns true if nothing failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the paths that failed to save.
    pub fn failed_paths(&self) -> Vec<&Path> {
        self.failed.iter().map(|f| f.path.as_path()).collect()
    }
}

/// Controller for one editing session.
///
/// ## Thread Safety
///
/// The controller is owned by a single task (the UI loop). Only file I/O
/// leaves that task, and its results come back through `finish_*`.
pub struct SessionController<E: EditorEngine = TextBuffer> {
    /// Project the session is bound to
    project: ProjectContext,

    /// Session configuration
    config: Config,

    /// Backing file access
    fs: Arc<dyn FileSystem>,

    /// Open documents in tab order
    documents: Vec<DocumentHandle<E>>,

    /// `None` iff `documents` is empty
    selected: Option<usize>,

    /// Cached capability of the selected engine
    can_undo: bool,
    can_redo: bool,

    /// Overflow menu toggle
    more_menu_open: bool,

    /// Bumped when the session ends; stale completions are dropped
    epoch: u64,

    /// Out-of-band signals
    signals: SignalBus,

    /// Latest snapshot for subscribers
    states: watch::Sender<SessionState>,
}

impl<E: EditorEngine> SessionController<E> {
    /// Starts an empty session for `project`.
    pub fn new(project: ProjectContext, fs: Arc<dyn FileSystem>, config: Config) -> Self {
        let (states, _) = watch::channel(SessionState::empty(project.name()));
        tracing::info!("Session started for {}", project.root().display());

        Self {
            project,
            config,
            fs,
            documents: Vec::new(),
            selected: None,
            can_undo: false,
            can_redo: false,
            more_menu_open: false,
            epoch: 0,
            signals: SignalBus::new(),
            states,
        }
    }

    /// Starts an empty session backed by the real filesystem.
    pub fn with_disk(project: ProjectContext, config: Config) -> Self {
        let fs = DiskFileSystem::new().with_atomic_writes(config.files.atomic_save);
        Self::new(project, Arc::new(fs), config)
    }

    // ==================== Queries ====================

    /// Returns the project this session is bound to.
    pub fn project(&self) -> &ProjectContext {
        &self.project
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the open documents in tab order.
    pub fn documents(&self) -> &[DocumentHandle<E>] {
        &self.documents
    }

    /// Returns the document at `index`.
    pub fn document(&self, index: usize) -> Option<&DocumentHandle<E>> {
        self.documents.get(index)
    }

    /// Returns the selected index.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Returns the selected document.
    pub fn selected_document(&self) -> Option<&DocumentHandle<E>> {
        self.selected.and_then(|i| self.documents.get(i))
    }

    /// Returns the selected engine.
    pub fn selected_engine(&self) -> Option<&E> {
        self.selected_document().map(DocumentHandle::engine)
    }

    /// Returns the selected engine for direct editing.
    ///
    /// The cached undo/redo flags are stale after editing through this
    /// reference until [`observe_changes`](Self::observe_changes) or
    /// [`refresh_undo_redo_flags`](Self::refresh_undo_redo_flags) runs.
    pub fn selected_engine_mut(&mut self) -> Option<&mut E> {
        self.selected_handle_mut().map(DocumentHandle::engine_mut)
    }

    /// Returns the number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no documents are open.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns true if any document has unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        self.documents.iter().any(|d| d.is_dirty())
    }

    /// Takes a snapshot of the session.
    pub fn state(&self) -> SessionState {
        let title = self
            .selected_document()
            .map(|d| d.name().to_string())
            .unwrap_or_else(|| self.project.name().to_string());

        SessionState {
            documents: self.documents.iter().map(DocumentHandle::tab).collect(),
            selected_index: self.selected,
            can_undo: self.can_undo,
            can_redo: self.can_redo,
            more_menu_open: self.more_menu_open,
            title,
        }
    }

    /// Subscribes to snapshots published after every change.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.states.subscribe()
    }

    /// Subscribes to out-of-band signals.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    // ==================== Opening ====================

    /// Opens a file, or selects it if it is already open.
    ///
    /// Relative paths are resolved against the project root. A reserved
    /// configuration file is never opened as a tab; the settings
    /// navigation is signalled instead.
    pub async fn open_document(&mut self, path: impl AsRef<Path>) -> CoreResult<OpenOutcome> {
        let done = self.begin_open(path).wait().await;
        self.finish_open(done)
    }

    /// Starts reading a file on the blocking pool.
    pub fn begin_open(&self, path: impl AsRef<Path>) -> PendingOpen {
        let path = self.project.resolve(path);
        let needs_read =
            !self.config.session.is_reserved(&path) && self.position_of(&path).is_none();

        let task = needs_read.then(|| {
            let fs = Arc::clone(&self.fs);
            let limit = self.config.files.max_file_size_bytes();
            let path = path.clone();
            tokio::task::spawn_blocking(move || fs::read_text(fs.as_ref(), &path, limit))
        });

        PendingOpen {
            path,
            epoch: self.epoch,
            task,
        }
    }

    /// Applies a finished read.
    ///
    /// On failure the document list is left untouched.
    pub fn finish_open(&mut self, done: OpenCompletion) -> CoreResult<OpenOutcome> {
        if done.epoch != self.epoch {
            tracing::debug!("Dropping read of {} from ended session", done.path.display());
            return Ok(OpenOutcome::Discarded);
        }

        if self.config.session.is_reserved(&done.path) {
            tracing::debug!("{} is reserved, opening project settings", done.path.display());
            self.signals.emit(SessionSignal::OpenProjectSettings {
                project_root: self.project.root().to_path_buf(),
            });
            return Ok(OpenOutcome::ProjectSettings);
        }

        if let Some(index) = self.position_of(&done.path) {
            self.select_index(index);
            self.publish();
            return Ok(OpenOutcome::Selected(index));
        }

        let text = match done.result {
            ReadResult::Read(result) => {
                result.map_err(|source| CoreError::io(&done.path, source))?
            }
            ReadResult::FocusOnly => {
                tracing::debug!(
                    "{} was closed before it could be focused",
                    done.path.display()
                );
                return Ok(OpenOutcome::Discarded);
            }
        };
        let engine = E::from_text(&text, &EngineOptions::from_config(&self.config));
        let handle = DocumentHandle::new(done.path, engine);
        let id = handle.id();

        tracing::debug!("Opened {} as {}", handle.path().display(), id);
        self.documents.push(handle);
        let index = self.documents.len() - 1;
        self.select_index(index);

        self.signals.emit(SessionSignal::DocumentOpened(id));
        self.publish();
        Ok(OpenOutcome::Opened(index))
    }

    fn position_of(&self, path: &Path) -> Option<usize> {
        self.documents.iter().position(|d| d.path() == path)
    }

    // ==================== Selection ====================

    /// Selects the document at `index`.
    ///
    /// Selecting the current document only refreshes the undo/redo flags.
    pub fn select_document(&mut self, index: usize) -> CoreResult<()> {
        self.check_index(index)?;
        self.select_index(index);
        self.publish();
        Ok(())
    }

    fn check_index(&self, index: usize) -> CoreResult<()> {
        if index < self.documents.len() {
            Ok(())
        } else {
            Err(CoreError::InvalidIndex {
                index,
                len: self.documents.len(),
            })
        }
    }

    fn select_index(&mut self, index: usize) {
        self.selected = Some(index);
        self.refresh_flags();
    }

    // ==================== Closing ====================

    /// Closes the document at `index`, discarding unsaved edits.
    pub fn close_document(&mut self, index: usize) -> CoreResult<()> {
        self.check_index(index)?;
        let handle = self.documents.remove(index);

        self.selected = match self.selected {
            _ if self.documents.is_empty() => None,
            Some(selected) if index <= selected => Some(selected.saturating_sub(1)),
            other => other,
        }
        .map(|i| i.min(self.documents.len() - 1));

        tracing::debug!("Closed {}", handle.path().display());
        self.signals.emit(SessionSignal::DocumentClosed(handle.id()));
        drop(handle);

        self.refresh_flags();
        self.publish();
        Ok(())
    }

    /// Closes every document except the selected one.
    pub fn close_others(&mut self) {
        let Some(selected) = self.selected else {
            self.close_all();
            return;
        };

        let keep = self.documents.remove(selected);
        let closed = std::mem::replace(&mut self.documents, vec![keep]);
        self.emit_closed(closed);

        self.selected = Some(0);
        self.refresh_flags();
        self.publish();
    }

    /// Closes every document.
    pub fn close_all(&mut self) {
        let closed = std::mem::take(&mut self.documents);
        self.emit_closed(closed);

        self.selected = None;
        self.refresh_flags();
        self.publish();
    }

    fn emit_closed(&self, closed: Vec<DocumentHandle<E>>) {
        for handle in closed {
            tracing::debug!("Closed {}", handle.path().display());
            self.signals.emit(SessionSignal::DocumentClosed(handle.id()));
        }
    }

    /// Ends the session.
    ///
    /// Every document is closed and reads still in flight will be dropped
    /// when they complete.
    pub fn end_session(&mut self) {
        self.close_all();
        self.epoch += 1;
        self.more_menu_open = false;
        tracing::info!("Session ended for {}", self.project.root().display());
        self.signals.emit(SessionSignal::SessionEnded);
        self.publish();
    }

    // ==================== Saving ====================

    /// Writes the selected document to disk.
    ///
    /// On failure the document stays dirty.
    pub async fn save_current(&mut self) -> CoreResult<SaveOutcome> {
        let index = self.selected.ok_or(CoreError::NoActiveDocument)?;
        let done = self.begin_save(index)?.wait().await;
        let outcome = self.finish_save(done)?;

        if matches!(outcome, SaveOutcome::Saved(_)) {
            self.notify(self.config.session.saved_message.clone(), NotifyLevel::Info);
        }
        Ok(outcome)
    }

    /// Writes every open document to disk.
    ///
    /// A failing document never stops the others from being written.
    pub async fn save_all(&mut self) -> SaveReport {
        let pending: Vec<PendingSave> = self.documents.iter().map(|d| self.spawn_save(d)).collect();

        let mut report = SaveReport::default();
        for save in pending {
            let done = save.wait().await;
            let path = done.path.clone();
            match self.finish_save(done) {
                Ok(SaveOutcome::Saved(path)) => report.saved.push(path),
                Ok(SaveOutcome::Discarded) => {}
                Err(error) => report.failed.push(SaveFailure { path, error }),
            }
        }

        if report.is_complete() {
            self.notify(
                self.config.session.saved_all_message.clone(),
                NotifyLevel::Info,
            );
        } else {
            let names: Vec<String> = report
                .failed
                .iter()
                .map(|f| f.path.display().to_string())
                .collect();
            self.notify(
                format!("Could not save: {}", names.join(", ")),
                NotifyLevel::Warning,
            );
        }
        report
    }

    /// Starts writing the document at `index` on the blocking pool.
    ///
    /// The text and revision are captured now; later edits are not part
    /// of this save.
    pub fn begin_save(&self, index: usize) -> CoreResult<PendingSave> {
        self.check_index(index)?;
        Ok(self.spawn_save(&self.documents[index]))
    }

    fn spawn_save(&self, handle: &DocumentHandle<E>) -> PendingSave {
        let fs = Arc::clone(&self.fs);
        let path = handle.path().to_path_buf();
        let bytes = handle.engine().text().into_bytes();
        let task = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || fs.write_file(&path, &bytes))
        };

        PendingSave {
            id: handle.id(),
            path,
            revision: handle.engine().revision(),
            task,
        }
    }

    /// Applies a finished write.
    ///
    /// A completion for a document closed in the meantime is dropped.
    pub fn finish_save(&mut self, done: SaveCompletion) -> CoreResult<SaveOutcome> {
        let Some(handle) = self.documents.iter_mut().find(|d| d.id() == done.id) else {
            tracing::debug!("Dropping save of closed document {}", done.path.display());
            return Ok(SaveOutcome::Discarded);
        };

        if let Err(source) = done.result {
            tracing::warn!("Failed to save {}: {}", done.path.display(), source);
            return Err(CoreError::io(done.path, source));
        }

        handle.engine_mut().mark_saved(done.revision);
        tracing::debug!("Saved {}", done.path.display());
        self.signals.emit(SessionSignal::DocumentSaved(done.id));
        self.publish();
        Ok(SaveOutcome::Saved(done.path))
    }

    // ==================== Undo/Redo ====================

    /// Undoes the last edit of the selected document.
    ///
    /// Returns false, changing nothing, when there is no undo history.
    pub fn undo(&mut self) -> CoreResult<bool> {
        let applied = self.selected_handle()?.engine_mut().undo();
        if !applied {
            tracing::trace!("Nothing to undo");
        }
        self.refresh_undo_redo_flags();
        Ok(applied)
    }

    /// Redoes the last undone edit of the selected document.
    pub fn redo(&mut self) -> CoreResult<bool> {
        let applied = self.selected_handle()?.engine_mut().redo();
        if !applied {
            tracing::trace!("Nothing to redo");
        }
        self.refresh_undo_redo_flags();
        Ok(applied)
    }

    /// Runs `edit` against the selected engine, then refreshes the flags.
    pub fn edit_selected<R>(&mut self, edit: impl FnOnce(&mut E) -> R) -> CoreResult<R> {
        let result = edit(self.selected_handle()?.engine_mut());
        self.refresh_undo_redo_flags();
        Ok(result)
    }

    /// Re-reads undo/redo capability from the selected engine.
    pub fn refresh_undo_redo_flags(&mut self) {
        self.refresh_flags();
        self.publish();
    }

    /// Refreshes the flags if the selected engine changed since the last
    /// observation. Returns true if it did.
    pub fn observe_changes(&mut self) -> bool {
        let changed = self
            .selected_handle_mut()
            .is_some_and(DocumentHandle::take_change);
        if changed {
            self.refresh_undo_redo_flags();
        }
        changed
    }

    fn refresh_flags(&mut self) {
        let (can_undo, can_redo) = match self.selected_handle_mut() {
            Some(handle) => {
                handle.mark_seen();
                (handle.engine().can_undo(), handle.engine().can_redo())
            }
            None => (false, false),
        };
        self.can_undo = can_undo;
        self.can_redo = can_redo;
    }

    fn selected_handle(&mut self) -> CoreResult<&mut DocumentHandle<E>> {
        self.selected_handle_mut()
            .ok_or(CoreError::NoActiveDocument)
    }

    pub(crate) fn selected_handle_mut(&mut self) -> Option<&mut DocumentHandle<E>> {
        self.selected.and_then(|i| self.documents.get_mut(i))
    }

    // ==================== UI ====================

    /// Opens or closes the overflow menu.
    pub fn toggle_more_menu(&mut self) {
        self.more_menu_open = !self.more_menu_open;
        self.publish();
    }

    /// Returns true if the overflow menu is open.
    pub fn is_more_menu_open(&self) -> bool {
        self.more_menu_open
    }

    // ==================== Signals ====================

    pub(crate) fn notify(&self, message: String, level: NotifyLevel) {
        self.signals.emit(SessionSignal::Notify { message, level });
    }

    fn publish(&self) {
        self.states.send_replace(self.state());
    }
}
