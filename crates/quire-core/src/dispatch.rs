//! Routing session events to the controller.
//!
//! ## Learning: The Command Pattern
//!
//! Input handling never calls the controller directly. It posts a
//! [`SessionEvent`] and the owning task applies it here, so every
//! mutation happens on one task in the order events were consumed.

use crate::controller::{OpenOutcome, SaveOutcome, SaveReport, SessionController};
use crate::document::DocumentHandle;
use crate::engine::EditorEngine;
use crate::event::{EventReceiver, NotifyLevel, SessionEvent};
use crate::CoreResult;

/// What applying one event produced.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The event changed (or confirmed) the session state
    Applied,
    Open(OpenOutcome),
    Save(SaveOutcome),
    SaveAll(SaveReport),
    /// Undo or redo; `applied` is false when there was no history step
    History { applied: bool },
}

enum Wakeup {
    Event(Option<SessionEvent>),
    EngineChanged,
}

impl<E: EditorEngine> SessionController<E> {
    /// Applies one event.
    pub async fn dispatch(&mut self, event: SessionEvent) -> CoreResult<DispatchOutcome> {
        tracing::debug!("Dispatching {}", event.display_name());

        let outcome = match event {
            SessionEvent::SelectDocument(index) => {
                self.select_document(index)?;
                DispatchOutcome::Applied
            }
            SessionEvent::OpenDocument(path) => {
                DispatchOutcome::Open(self.open_document(path).await?)
            }
            SessionEvent::CloseDocument(index) => {
                self.close_document(index)?;
                DispatchOutcome::Applied
            }
            SessionEvent::CloseOthers => {
                self.close_others();
                DispatchOutcome::Applied
            }
            SessionEvent::CloseAll => {
                self.close_all();
                DispatchOutcome::Applied
            }
            SessionEvent::SaveCurrent => DispatchOutcome::Save(self.save_current().await?),
            SessionEvent::SaveAll => DispatchOutcome::SaveAll(self.save_all().await),
            SessionEvent::Undo => DispatchOutcome::History {
                applied: self.undo()?,
            },
            SessionEvent::Redo => DispatchOutcome::History {
                applied: self.redo()?,
            },
            SessionEvent::ToggleMoreMenu => {
                self.toggle_more_menu();
                DispatchOutcome::Applied
            }
        };

        Ok(outcome)
    }

    /// Drives the session until every event sender is dropped.
    ///
    /// Failed events are reported as error notifications and the loop
    /// keeps going. Edits made to the selected engine outside the
    /// controller refresh the undo/redo flags as they happen.
    pub async fn run(&mut self, mut events: EventReceiver) {
        tracing::info!("Session event loop started");

        loop {
            let wakeup = {
                let selected = self.selected_handle_mut();
                tokio::select! {
                    event = events.recv() => Wakeup::Event(event),
                    _ = engine_changed(selected) => Wakeup::EngineChanged,
                }
            };

            match wakeup {
                Wakeup::Event(None) => break,
                Wakeup::Event(Some(event)) => {
                    let name = event.display_name();
                    if let Err(err) = self.dispatch(event).await {
                        tracing::warn!("{} failed: {}", name, err);
                        self.notify(err.to_string(), NotifyLevel::Error);
                    }
                }
                Wakeup::EngineChanged => self.refresh_undo_redo_flags(),
            }
        }

        tracing::info!("Session event loop stopped");
    }
}

async fn engine_changed<E: EditorEngine>(handle: Option<&mut DocumentHandle<E>>) {
    match handle {
        Some(handle) => handle.changed().await,
        None => std::future::pending().await,
    }
}
