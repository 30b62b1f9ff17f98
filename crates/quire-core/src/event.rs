//! User intents flowing in, signals flowing out.
//!
//! ## Inbound: the single-slot event queue
//!
//! Input handling posts a [`SessionEvent`]; the dispatcher consumes it.
//! At most one event is pending. Posting over an unconsumed event replaces
//! it and hands the displaced event back to the poster. Consuming takes
//! the event out of the slot, so an event can never be delivered twice.
//!
//! ## Outbound: the signal bus
//!
//! Side effects the session cannot perform itself (navigating to the
//! project settings, showing a message) are broadcast as
//! [`SessionSignal`]s with `tokio::sync::broadcast`:
//! - Multiple subscribers (UI, logging, tests)
//! - Lagged receivers don't block the session

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, broadcast};

use crate::document::DocumentId;

/// A user intent addressed to the session.
///
/// ## Learning: Enum Variants
///
/// Each variant carries exactly the data its handler needs, and the
/// dispatcher's `match` is checked for exhaustiveness by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Select the tab at this index
    SelectDocument(usize),
    /// Open (or focus) the file at this path
    OpenDocument(PathBuf),
    /// Close the tab at this index
    CloseDocument(usize),
    /// Close every tab except the selected one
    CloseOthers,
    /// Close every tab
    CloseAll,
    /// Write the selected document to disk
    SaveCurrent,
    /// Write every open document to disk
    SaveAll,
    /// Step the selected document back one edit
    Undo,
    /// Re-apply the selected document's last undone edit
    Redo,
    /// Open or close the overflow menu
    ToggleMoreMenu,
}

impl SessionEvent {
    /// Returns the event's display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionEvent::SelectDocument(_) => "Select Document",
            SessionEvent::OpenDocument(_) => "Open Document",
            SessionEvent::CloseDocument(_) => "Close Document",
            SessionEvent::CloseOthers => "Close Others",
            SessionEvent::CloseAll => "Close All",
            SessionEvent::SaveCurrent => "Save",
            SessionEvent::SaveAll => "Save All",
            SessionEvent::Undo => "Undo",
            SessionEvent::Redo => "Redo",
            SessionEvent::ToggleMoreMenu => "More",
        }
    }
}

// ==================== Event Queue ====================

struct Slot {
    pending: Mutex<Option<SessionEvent>>,
    posted: Notify,
    senders: AtomicUsize,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, Option<SessionEvent>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a single-slot event queue.
pub fn event_queue() -> (EventSender, EventReceiver) {
    let slot = Arc::new(Slot {
        pending: Mutex::new(None),
        posted: Notify::new(),
        senders: AtomicUsize::new(1),
    });
    (
        EventSender {
            slot: Arc::clone(&slot),
        },
        EventReceiver { slot },
    )
}

/// Posting half of the event queue. Cheap to clone.
pub struct EventSender {
    slot: Arc<Slot>,
}

impl EventSender {
    /// Posts an event, replacing any event not yet consumed.
    ///
    /// Returns the displaced event, if any.
    pub fn post(&self, event: SessionEvent) -> Option<SessionEvent> {
        let displaced = self.slot.lock().replace(event);
        if let Some(ref old) = displaced {
            tracing::warn!("Pending event {:?} replaced before dispatch", old);
        }
        self.slot.posted.notify_one();
        displaced
    }

    /// Returns true while a posted event has not been consumed.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl Clone for EventSender {
    fn clone(&self) -> Self {
        self.slot.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl Drop for EventSender {
    fn drop(&mut self) {
        if self.slot.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Wake the receiver so it can observe the closed queue
            self.slot.posted.notify_one();
        }
    }
}

/// Consuming half of the event queue.
pub struct EventReceiver {
    slot: Arc<Slot>,
}

impl EventReceiver {
    /// Takes the pending event, leaving the slot empty.
    pub fn consume(&mut self) -> Option<SessionEvent> {
        self.slot.lock().take()
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once every sender is gone and the slot is empty.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.consume() {
                return Some(event);
            }
            if self.slot.senders.load(Ordering::Acquire) == 0 {
                return None;
            }
            self.slot.posted.notified().await;
        }
    }
}

// ==================== Signals ====================

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// Out-of-band signals for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// A reserved configuration file was opened
    OpenProjectSettings { project_root: PathBuf },
    /// Show a short message to the user
    Notify { message: String, level: NotifyLevel },
    DocumentOpened(DocumentId),
    DocumentClosed(DocumentId),
    DocumentSaved(DocumentId),
    /// The session was ended; no further completions will apply
    SessionEnded,
}

/// Broadcasts [`SessionSignal`]s to any number of subscribers.
#[derive(Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<SessionSignal>,
}

impl SignalBus {
    /// Creates a new signal bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Emits a signal to all subscribers.
    pub fn emit(&self, signal: SessionSignal) {
        // No receivers is fine
        let _ = self.sender.send(signal);
    }

    /// Subscribes to all future signals.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.sender.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for consuming signals.
///
/// ## Example
///
/// ```ignore
/// let mut signals = SignalHandler::new(session.subscribe_signals());
///
/// tokio::spawn(async move {
///     while let Some(signal) = signals.next().await {
///         if let SessionSignal::Notify { message, .. } = signal {
///             show_toast(&message);
///         }
///     }
/// });
/// ```
pub struct SignalHandler {
    receiver: broadcast::Receiver<SessionSignal>,
}

impl SignalHandler {
    /// Creates a new signal handler.
    pub fn new(receiver: broadcast::Receiver<SessionSignal>) -> Self {
        Self { receiver }
    }

    /// Waits for the next signal.
    pub async fn next(&mut self) -> Option<SessionSignal> {
        loop {
            match self.receiver.recv().await {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Signal handler lagged, missed {} signals", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns every signal already delivered, without waiting.
    pub fn drain(&mut self) -> Vec<SessionSignal> {
        let mut signals = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(signal) => signals.push(signal),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Signal handler lagged, missed {} signals", n);
                }
                Err(_) => return signals,
            }
        }
    }
}
