#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use emlak_core::listing::ListingDraft;
use emlak_core::types::DbId;
use emlak_editor::config::EditorConfig;
use emlak_editor::store::{ListingStore, PersistenceError};

/// A listing that passes the required-field policy.
pub fn valid_listing() -> ListingDraft {
    ListingDraft {
        title: "Deniz Manzaralı Daire".into(),
        slug: "deniz-manzarali-daire".into(),
        property_type: "apartment".into(),
        location: "Kaş, Antalya".into(),
        price: Some(4_750_000.0),
        ..Default::default()
    }
}

/// Config with autosave off, so only explicit flushes hit the store.
pub fn manual_config() -> EditorConfig {
    EditorConfig {
        autosave_enabled: false,
        ..EditorConfig::default()
    }
}

/// Config with autosave on and the given debounce.
pub fn autosave_config(debounce_ms: u64) -> EditorConfig {
    EditorConfig {
        autosave_enabled: true,
        autosave_debounce: Duration::from_millis(debounce_ms),
        ..EditorConfig::default()
    }
}

/// Yield to the scheduler until `condition` holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached after 200 yields");
}

/// Store whose saves block until the test releases them, tracking how many
/// requests are in flight at once.
pub struct GatedStore {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: Semaphore,
}

impl GatedStore {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    /// Let `n` pending or future saves complete.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingStore for GatedStore {
    async fn save(&self, _id: DbId, draft: &ListingDraft) -> Result<ListingDraft, PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let permit = self.gate.acquire().await.map_err(|e| PersistenceError::Network {
            message: e.to_string(),
        })?;
        permit.forget();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(draft.clone())
    }
}
