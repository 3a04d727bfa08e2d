//! In-process editor event stream backed by a `tokio::sync::broadcast`
//! channel.
//!
//! The UI subscribes to drive banners and toasts; the demo binary logs every
//! event. Publishing never blocks and never fails.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use emlak_core::types::Timestamp;
use emlak_core::validation::FieldErrors;

use crate::controller::{ChangeCause, SaveTrigger};
use crate::store::PersistenceError;

/// Something observable happened in an editor session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    /// The draft changed and is now at `revision`.
    Changed { revision: u64, cause: ChangeCause },

    /// A save request was sent.
    SaveStarted {
        request_id: Uuid,
        revision: u64,
        trigger: SaveTrigger,
    },

    /// The save of `revision` succeeded and the draft is clean.
    Saved {
        request_id: Uuid,
        revision: u64,
        at: Timestamp,
    },

    /// The save failed; the draft keeps its unsaved changes.
    SaveFailed {
        request_id: Uuid,
        revision: u64,
        error: PersistenceError,
    },

    /// A save succeeded after newer edits were made; the draft stays dirty.
    StaleResponseIgnored {
        request_id: Uuid,
        saved_revision: u64,
        current_revision: u64,
    },

    /// A validating save was refused before anything was sent.
    SaveBlocked {
        trigger: SaveTrigger,
        errors: FieldErrors,
    },

    /// A `saved` / `error` banner timed out and the status is idle again.
    BannerCleared,
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`EditorEvent`]s to any number of subscribers.
///
/// Slow receivers observe `RecvError::Lagged` once more than
/// `DEFAULT_CAPACITY` events are buffered.
pub struct EditorEvents {
    sender: broadcast::Sender<EditorEvent>,
}

impl EditorEvents {
    pub fn publish(&self, event: EditorEvent) {
        // A send error only means nobody is listening.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EditorEvents {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { sender }
    }
}
