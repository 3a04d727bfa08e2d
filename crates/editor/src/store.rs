//! Persistence collaborator for listing drafts.
//!
//! The editor only needs one call, [`ListingStore::save`]. Transport, wire
//! format and endpoints belong to the implementation. Implementations must
//! tolerate the same `(id, draft)` being saved more than once, since
//! autosave re-issues requests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use emlak_core::listing::ListingDraft;
use emlak_core::types::{DbId, Timestamp};

/// Why a save request did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistenceError {
    /// The request never got a response.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The backend answered with a non-success status.
    #[error("Save rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The listing was changed elsewhere.
    #[error("Conflict: {message}")]
    Conflict { message: String },
}

/// Saves the current value of a listing.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Persist `draft` as the new value of listing `id` and return the
    /// entity as stored.
    async fn save(&self, id: DbId, draft: &ListingDraft) -> Result<ListingDraft, PersistenceError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A listing as kept by [`InMemoryStore`].
#[derive(Debug, Clone, Serialize)]
pub struct StoredListing {
    pub draft: ListingDraft,
    /// Number of successful saves of this listing.
    pub version: u64,
    pub updated_at: Timestamp,
}

/// [`ListingStore`] backed by a map, with optional latency and scripted
/// failures. Used by the demo binary and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    listings: RwLock<HashMap<DbId, StoredListing>>,
    latency: Duration,
    scripted_failures: Mutex<VecDeque<PersistenceError>>,
    save_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every save by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make the next save fail with `error`. Queued failures are consumed
    /// in order, one per save call.
    pub async fn fail_next(&self, error: PersistenceError) {
        self.scripted_failures.lock().await.push_back(error);
    }

    /// Total number of save calls, successful or not.
    pub fn save_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, id: DbId) -> Option<StoredListing> {
        self.listings.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl ListingStore for InMemoryStore {
    async fn save(&self, id: DbId, draft: &ListingDraft) -> Result<ListingDraft, PersistenceError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(error) = self.scripted_failures.lock().await.pop_front() {
            return Err(error);
        }

        let mut listings = self.listings.write().await;
        let version = listings.get(&id).map_or(1, |stored| stored.version + 1);
        listings.insert(
            id,
            StoredListing {
                draft: draft.clone(),
                version,
                updated_at: Utc::now(),
            },
        );

        Ok(draft.clone())
    }
}
