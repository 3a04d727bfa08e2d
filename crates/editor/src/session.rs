//! Async editor session: debounced autosave and save coalescing around a
//! [`DraftController`].
//!
//! One [`EditorSession`] exists per open editor. Edits go straight to the
//! controller; every effective change is published on a `watch` channel of
//! revisions that a background task debounces into autosaves. All saves,
//! explicit or automatic, pass through a save gate so at most one request is
//! in flight. A `flush()` issued while another save is running waits for it
//! and then re-checks whether anything is left to save.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use emlak_core::listing::{ListingDraft, ListingPatch};
use emlak_core::types::{DbId, Timestamp};

use crate::config::EditorConfig;
use crate::controller::{
    ChangeCause, DraftController, EditorStatus, SaveOutcome, SaveState, SaveTrigger,
};
use crate::error::{EditorError, EditorResult};
use crate::events::{EditorEvent, EditorEvents};
use crate::store::ListingStore;

/// Result of a save that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Nothing to save; no request was sent.
    UpToDate,
    /// The draft at `revision` is persisted and the draft is clean.
    Saved { revision: u64, at: Timestamp },
    /// The request succeeded but newer edits arrived meanwhile; they are
    /// still pending.
    Superseded {
        saved_revision: u64,
        current_revision: u64,
    },
}

/// State shared between the session handle and its background tasks.
struct SessionInner {
    listing_id: DbId,
    controller: Mutex<DraftController>,
    /// Held for the whole duration of a save request.
    save_gate: Mutex<()>,
    store: Arc<dyn ListingStore>,
    config: EditorConfig,
    events: EditorEvents,
    revisions: watch::Sender<u64>,
    cancel: CancellationToken,
}

/// Handle to one open listing editor.
pub struct EditorSession {
    inner: Arc<SessionInner>,
    autosave_task: Option<JoinHandle<()>>,
}

impl EditorSession {
    /// Open an editor on `loaded` and start the autosave task if enabled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(
        listing_id: DbId,
        loaded: ListingDraft,
        store: Arc<dyn ListingStore>,
        config: EditorConfig,
    ) -> Self {
        let (revisions, revision_rx) = watch::channel(0);
        let controller = DraftController::new(listing_id, loaded, config.history_limit);

        let inner = Arc::new(SessionInner {
            listing_id,
            controller: Mutex::new(controller),
            save_gate: Mutex::new(()),
            store,
            config,
            events: EditorEvents::default(),
            revisions,
            cancel: CancellationToken::new(),
        });

        let autosave_task = inner.config.autosave_enabled.then(|| {
            tokio::spawn(autosave_loop(Arc::clone(&inner), revision_rx))
        });

        tracing::info!(
            listing_id,
            autosave = inner.config.autosave_enabled,
            debounce_ms = inner.config.autosave_debounce.as_millis() as u64,
            "Editor session opened",
        );

        Self {
            inner,
            autosave_task,
        }
    }

    pub fn listing_id(&self) -> DbId {
        self.inner.listing_id
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.inner.events.subscribe()
    }

    pub async fn current_draft(&self) -> ListingDraft {
        self.inner.controller.lock().await.current_draft().clone()
    }

    pub async fn status(&self) -> EditorStatus {
        self.inner.controller.lock().await.status()
    }

    pub async fn can_undo(&self) -> bool {
        self.inner.controller.lock().await.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.inner.controller.lock().await.can_redo()
    }

    /// Apply a partial update. Returns `false` if it changed nothing.
    pub async fn mutate(&self, patch: ListingPatch) -> EditorResult<bool> {
        let revision = {
            let mut controller = self.inner.controller.lock().await;
            if !controller.mutate(&patch)? {
                return Ok(false);
            }
            controller.revision()
        };
        self.inner.changed(revision, ChangeCause::Edit);
        Ok(true)
    }

    /// Move the image at `from` to position `to`.
    pub async fn move_image(&self, from: usize, to: usize) -> EditorResult<bool> {
        let revision = {
            let mut controller = self.inner.controller.lock().await;
            if !controller.move_image(from, to)? {
                return Ok(false);
            }
            controller.revision()
        };
        self.inner.changed(revision, ChangeCause::Edit);
        Ok(true)
    }

    pub async fn undo(&self) -> bool {
        let revision = {
            let mut controller = self.inner.controller.lock().await;
            if !controller.undo() {
                return false;
            }
            controller.revision()
        };
        self.inner.changed(revision, ChangeCause::Undo);
        true
    }

    pub async fn redo(&self) -> bool {
        let revision = {
            let mut controller = self.inner.controller.lock().await;
            if !controller.redo() {
                return false;
            }
            controller.revision()
        };
        self.inner.changed(revision, ChangeCause::Redo);
        true
    }

    /// Explicit save: validates required fields, then saves if dirty.
    ///
    /// Waits for any in-flight save first. Store failures are returned as
    /// [`EditorError::Persistence`] and leave the draft dirty.
    pub async fn flush(&self) -> EditorResult<FlushOutcome> {
        self.inner.save(SaveTrigger::Manual, true).await
    }

    /// Stop autosaving and, if configured, save what is still unsaved.
    ///
    /// The final save skips validation so partial input is not lost.
    pub async fn close(mut self) -> EditorResult<FlushOutcome> {
        self.inner.cancel.cancel();
        if let Some(task) = self.autosave_task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Autosave task panicked");
            }
        }

        let outcome = if self.inner.config.flush_on_close {
            self.inner.save(SaveTrigger::Close, false).await
        } else {
            Ok(FlushOutcome::UpToDate)
        };

        tracing::info!(listing_id = self.inner.listing_id, "Editor session closed");
        outcome
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl SessionInner {
    /// Publish a draft change and re-arm the autosave timer.
    fn changed(&self, revision: u64, cause: ChangeCause) {
        tracing::debug!(listing_id = self.listing_id, revision, ?cause, "Draft changed");
        self.events.publish(EditorEvent::Changed { revision, cause });
        self.revisions.send_replace(revision);
    }

    /// The single save path shared by flush, autosave and close.
    ///
    /// The request runs on its own task: a caller that stops waiting (a
    /// timeout, a dropped future) detaches from it, but the response is still
    /// recorded and the save gate is released only once it has been.
    async fn save(
        self: &Arc<Self>,
        trigger: SaveTrigger,
        validate: bool,
    ) -> EditorResult<FlushOutcome> {
        let inner = Arc::clone(self);
        match tokio::spawn(inner.run_save(trigger, validate)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    listing_id = self.listing_id,
                    ?trigger,
                    error = %e,
                    "Save task did not finish",
                );
                self.controller.lock().await.abort_save();
                Err(EditorError::Interrupted(e.to_string()))
            }
        }
    }

    async fn run_save(
        self: Arc<Self>,
        trigger: SaveTrigger,
        validate: bool,
    ) -> EditorResult<FlushOutcome> {
        let _gate = self.save_gate.lock().await;

        let ticket = {
            let mut controller = self.controller.lock().await;
            match controller.begin_save(trigger, validate) {
                Ok(Some(ticket)) => ticket,
                Ok(None) => return Ok(FlushOutcome::UpToDate),
                Err(EditorError::Validation(errors)) => {
                    tracing::debug!(
                        listing_id = self.listing_id,
                        ?trigger,
                        %errors,
                        "Save blocked by validation",
                    );
                    self.events.publish(EditorEvent::SaveBlocked {
                        trigger,
                        errors: errors.clone(),
                    });
                    return Err(EditorError::Validation(errors));
                }
                Err(e) => return Err(e),
            }
        };

        tracing::debug!(
            listing_id = self.listing_id,
            request_id = %ticket.request_id,
            revision = ticket.revision,
            ?trigger,
            "Saving draft",
        );
        self.events.publish(EditorEvent::SaveStarted {
            request_id: ticket.request_id,
            revision: ticket.revision,
            trigger,
        });

        let result = self.store.save(ticket.listing_id, &ticket.draft).await;

        let (outcome, banner) = {
            let mut controller = self.controller.lock().await;
            let outcome = controller.complete_save(&ticket, result);
            (outcome, controller.state().clone())
        };

        match outcome {
            SaveOutcome::Saved { revision, at } => {
                tracing::info!(
                    listing_id = self.listing_id,
                    request_id = %ticket.request_id,
                    revision,
                    "Draft saved",
                );
                self.events.publish(EditorEvent::Saved {
                    request_id: ticket.request_id,
                    revision,
                    at,
                });
                self.schedule_banner_reset(banner, self.config.saved_banner);
                Ok(FlushOutcome::Saved { revision, at })
            }
            SaveOutcome::StaleResponseIgnored {
                saved_revision,
                current_revision,
            } => {
                tracing::warn!(
                    listing_id = self.listing_id,
                    request_id = %ticket.request_id,
                    saved_revision,
                    current_revision,
                    "Stale save response ignored; newer edits still pending",
                );
                self.events.publish(EditorEvent::StaleResponseIgnored {
                    request_id: ticket.request_id,
                    saved_revision,
                    current_revision,
                });
                Ok(FlushOutcome::Superseded {
                    saved_revision,
                    current_revision,
                })
            }
            SaveOutcome::Failed(error) => {
                tracing::warn!(
                    listing_id = self.listing_id,
                    request_id = %ticket.request_id,
                    revision = ticket.revision,
                    error = %error,
                    "Draft save failed",
                );
                self.events.publish(EditorEvent::SaveFailed {
                    request_id: ticket.request_id,
                    revision: ticket.revision,
                    error: error.clone(),
                });
                self.schedule_banner_reset(banner, self.config.error_banner);
                Err(EditorError::Persistence(error))
            }
        }
    }

    /// Return `expected` to idle after `delay` unless the state moved on.
    fn schedule_banner_reset(self: &Arc<Self>, expected: SaveState, delay: Duration) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let cleared = inner.controller.lock().await.expire_banner(&expected);
                    if cleared {
                        inner.events.publish(EditorEvent::BannerCleared);
                    }
                }
            }
        });
    }
}

/// Debounce revision changes into autosaves until the session is cancelled.
async fn autosave_loop(inner: Arc<SessionInner>, mut revisions: watch::Receiver<u64>) {
    let debounce = inner.config.autosave_debounce;

    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        // Quiet period: every further change restarts the timer.
        loop {
            tokio::select! {
                _ = inner.cancel.cancelled() => return,
                _ = tokio::time::sleep(debounce) => break,
                changed = revisions.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        match inner
            .save(SaveTrigger::Autosave, inner.config.autosave_validates)
            .await
        {
            Ok(FlushOutcome::UpToDate) => {
                tracing::debug!(listing_id = inner.listing_id, "Autosave skipped, draft clean");
            }
            Ok(_) => {}
            // Already logged and published by `save`; the draft stays dirty
            // and the next edit re-arms the timer.
            Err(e) => {
                tracing::debug!(listing_id = inner.listing_id, error = %e, "Autosave did not complete");
            }
        }
    }

    tracing::debug!(listing_id = inner.listing_id, "Autosave task stopped");
}
