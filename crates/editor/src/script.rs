//! Replay of recorded editor sessions.
//!
//! A session script is a JSON document holding the listing as loaded, the
//! behaviour of the in-memory store, and the user actions to replay:
//!
//! ```json
//! {
//!   "listing_id": 42,
//!   "listing": { "title": "", "price": null },
//!   "store": { "latency_ms": 150, "fail_next": [{ "kind": "network", "message": "offline" }] },
//!   "steps": [
//!     { "op": "mutate", "patch": { "title": "Deniz Manzaralı Daire" } },
//!     { "op": "wait", "ms": 2500 },
//!     { "op": "undo" },
//!     { "op": "flush" }
//!   ]
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

use emlak_core::listing::{ListingDraft, ListingPatch};
use emlak_core::types::DbId;

use crate::config::EditorConfig;
use crate::controller::EditorStatus;
use crate::events::EditorEvent;
use crate::session::EditorSession;
use crate::store::{InMemoryStore, PersistenceError};

/// A recorded editor session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionScript {
    pub listing_id: DbId,
    #[serde(default)]
    pub listing: ListingDraft,
    #[serde(default)]
    pub store: StoreSettings,
    pub steps: Vec<ScriptStep>,
}

/// Behaviour of the in-memory store used for a replay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub latency_ms: u64,
    /// Failures returned by the first save calls, in order.
    pub fail_next: Vec<PersistenceError>,
}

/// One user action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Mutate { patch: ListingPatch },
    MoveImage { from: usize, to: usize },
    Undo,
    Redo,
    Flush,
    /// Let `ms` milliseconds pass so timers can fire.
    Wait { ms: u64 },
}

impl ScriptStep {
    fn name(&self) -> &'static str {
        match self {
            Self::Mutate { .. } => "mutate",
            Self::MoveImage { .. } => "move_image",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Flush => "flush",
            Self::Wait { .. } => "wait",
        }
    }
}

/// What one step did.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub result: String,
    pub status: String,
}

/// Summary of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptReport {
    pub steps: Vec<StepReport>,
    pub close_result: String,
    pub final_status: EditorStatus,
    pub final_draft: ListingDraft,
    /// The listing as the store holds it after the session closed.
    pub persisted: Option<ListingDraft>,
    pub save_calls: usize,
}

/// Parse a script from JSON text.
pub fn parse_script(json: &str) -> Result<SessionScript, serde_json::Error> {
    serde_json::from_str(json)
}

/// Replay `script` in a fresh session and close it at the end.
pub async fn run_script(script: SessionScript, config: EditorConfig) -> ScriptReport {
    let store = Arc::new(InMemoryStore::with_latency(Duration::from_millis(
        script.store.latency_ms,
    )));
    for error in script.store.fail_next {
        store.fail_next(error).await;
    }

    let session = EditorSession::open(script.listing_id, script.listing, store.clone(), config);
    let logger = tokio::spawn(log_events(session.subscribe()));

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.into_iter().enumerate() {
        let op = step.name();
        let result = match step {
            ScriptStep::Mutate { patch } => match session.mutate(patch).await {
                Ok(changed) => changed_label(changed),
                Err(e) => format!("error: {e}"),
            },
            ScriptStep::MoveImage { from, to } => match session.move_image(from, to).await {
                Ok(changed) => changed_label(changed),
                Err(e) => format!("error: {e}"),
            },
            ScriptStep::Undo => changed_label(session.undo().await),
            ScriptStep::Redo => changed_label(session.redo().await),
            ScriptStep::Flush => match session.flush().await {
                Ok(outcome) => format!("{outcome:?}"),
                Err(e) => format!("error: {e}"),
            },
            ScriptStep::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                "waited".to_string()
            }
        };

        let status = session.status().await.label().to_string();
        tracing::info!(index, op, result = %result, status = %status, "Step replayed");
        steps.push(StepReport {
            index,
            op,
            result,
            status,
        });
    }

    let listing_id = session.listing_id();
    let final_status = session.status().await;
    let final_draft = session.current_draft().await;
    let close_result = match session.close().await {
        Ok(outcome) => format!("{outcome:?}"),
        Err(e) => format!("error: {e}"),
    };
    // The logger ends once the session (and its event sender) is gone.
    if let Err(e) = logger.await {
        tracing::error!(error = %e, "Event logger panicked");
    }

    ScriptReport {
        steps,
        close_result,
        final_status,
        final_draft,
        persisted: store.get(listing_id).await.map(|stored| stored.draft),
        save_calls: store.save_count(),
    }
}

fn changed_label(changed: bool) -> String {
    let label = if changed { "changed" } else { "no-op" };
    label.to_string()
}

async fn log_events(mut rx: tokio::sync::broadcast::Receiver<EditorEvent>) {
    loop {
        match rx.recv().await {
            Ok(EditorEvent::SaveFailed { error, revision, .. }) => {
                tracing::warn!(revision, error = %error, "Save failed");
            }
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::info!(event = %json, "Editor event"),
                Err(e) => tracing::warn!(error = %e, "Unserializable editor event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
