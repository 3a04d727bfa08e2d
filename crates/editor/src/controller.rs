//! Draft editor state controller.
//!
//! [`DraftController`] owns the undo history of one open listing, its dirty
//! flag, and the persistence status state machine:
//!
//! ```text
//! idle/saved/error --edit--> idle          (dirty = true)
//! idle --begin_save--> saving
//! saving --success, same revision--> saved (dirty = false)
//! saving --success, newer revision--> idle (stale response ignored)
//! saving --failure--> error                (dirty stays true)
//! saved/error --banner timeout--> idle
//! ```
//!
//! The controller is synchronous and does no I/O. A save is split into
//! [`DraftController::begin_save`], which hands out a [`SaveTicket`] stamped
//! with the current revision, and [`DraftController::complete_save`], which
//! only clears the dirty flag if no edit happened since the ticket was
//! issued.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use emlak_core::error::CoreError;
use emlak_core::history::History;
use emlak_core::listing::{ListingDraft, ListingPatch};
use emlak_core::types::{DbId, Timestamp};
use emlak_core::validation::validate_required;

use crate::error::{EditorError, EditorResult};
use crate::store::PersistenceError;

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// Persistence status of the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveState {
    Idle,
    /// A request issued at `revision` is in flight.
    Saving { revision: u64 },
    /// The request for `revision` succeeded.
    Saved { revision: u64, at: Timestamp },
    /// The request for `revision` failed.
    Error {
        revision: u64,
        error: PersistenceError,
        at: Timestamp,
    },
}

/// What started a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveTrigger {
    /// Explicit save button.
    Manual,
    /// Debounce timer after edits.
    Autosave,
    /// Session being closed with unsaved changes.
    Close,
}

/// Which user action changed the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    Edit,
    Undo,
    Redo,
}

/// A save request issued by [`DraftController::begin_save`].
#[derive(Debug, Clone)]
pub struct SaveTicket {
    pub request_id: Uuid,
    pub listing_id: DbId,
    /// Revision the draft had when the request was issued.
    pub revision: u64,
    pub trigger: SaveTrigger,
    pub draft: ListingDraft,
}

/// Result of applying a save response.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The saved revision is still current; the draft is clean.
    Saved { revision: u64, at: Timestamp },
    /// The response belongs to an older revision and was ignored.
    StaleResponseIgnored {
        saved_revision: u64,
        current_revision: u64,
    },
    /// The store failed; the draft is still dirty.
    Failed(PersistenceError),
}

/// Snapshot of the controller's status for the editor UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorStatus {
    pub dirty: bool,
    pub saving: bool,
    pub revision: u64,
    pub last_saved: Option<Timestamp>,
    pub last_error: Option<PersistenceError>,
    pub state: SaveState,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl EditorStatus {
    /// Banner label: `saving`, `saved`, `error`, `pending` (unsaved edits)
    /// or `idle`.
    pub fn label(&self) -> &'static str {
        match self.state {
            SaveState::Saving { .. } => "saving",
            SaveState::Saved { .. } => "saved",
            SaveState::Error { .. } => "error",
            SaveState::Idle if self.dirty => "pending",
            SaveState::Idle => "idle",
        }
    }
}

// ---------------------------------------------------------------------------
// DraftController
// ---------------------------------------------------------------------------

/// Editable draft of one listing with undo/redo and save tracking.
#[derive(Debug)]
pub struct DraftController {
    listing_id: DbId,
    history: History<ListingDraft>,
    /// Bumped on every effective edit, undo and redo.
    revision: u64,
    dirty: bool,
    last_saved: Option<Timestamp>,
    last_error: Option<PersistenceError>,
    state: SaveState,
}

impl DraftController {
    /// Seed a controller with the loaded listing as history root.
    ///
    /// `history_limit` bounds the number of snapshots; `None` keeps all.
    pub fn new(listing_id: DbId, loaded: ListingDraft, history_limit: Option<usize>) -> Self {
        let history = match history_limit {
            Some(limit) => History::with_capacity(loaded, limit),
            None => History::new(loaded),
        };

        Self {
            listing_id,
            history,
            revision: 0,
            dirty: false,
            last_saved: None,
            last_error: None,
            state: SaveState::Idle,
        }
    }

    pub fn listing_id(&self) -> DbId {
        self.listing_id
    }

    pub fn current_draft(&self) -> &ListingDraft {
        self.history.current()
    }

    pub fn history(&self) -> &History<ListingDraft> {
        &self.history
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn state(&self) -> &SaveState {
        &self.state
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn status(&self) -> EditorStatus {
        EditorStatus {
            dirty: self.dirty,
            saving: matches!(self.state, SaveState::Saving { .. }),
            revision: self.revision,
            last_saved: self.last_saved,
            last_error: self.last_error.clone(),
            state: self.state.clone(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Merge `patch` into the current draft.
    ///
    /// Returns `false` and changes nothing when the merged draft equals the
    /// current one (including an empty patch). A patch carrying a value no
    /// draft may hold is rejected without touching the history.
    pub fn mutate(&mut self, patch: &ListingPatch) -> Result<bool, CoreError> {
        patch.check()?;
        let next = self.history.current().apply(patch);
        if !self.history.push(next) {
            return Ok(false);
        }
        self.mark_changed();
        Ok(true)
    }

    /// Reorder the image gallery. Out-of-range indices leave the draft as is.
    pub fn move_image(&mut self, from: usize, to: usize) -> Result<bool, CoreError> {
        let patch = self.history.current().move_image(from, to)?;
        self.mutate(&patch)
    }

    /// Step back one snapshot. No-op at the loaded draft.
    pub fn undo(&mut self) -> bool {
        if !self.history.undo() {
            return false;
        }
        self.mark_changed();
        true
    }

    /// Step forward one snapshot. No-op at the newest snapshot.
    pub fn redo(&mut self) -> bool {
        if !self.history.redo() {
            return false;
        }
        self.mark_changed();
        true
    }

    fn mark_changed(&mut self) {
        self.revision += 1;
        self.dirty = true;
        // An in-flight save keeps its state until the response arrives.
        if !matches!(self.state, SaveState::Saving { .. }) {
            self.state = SaveState::Idle;
        }
    }

    /// Start a save of the current draft.
    ///
    /// - `Err(Busy)` if a save is already in flight;
    /// - `Err(Validation)` if `validate` is set and the draft fails the
    ///   required-field policy;
    /// - `Ok(None)` if there is nothing to save;
    /// - otherwise moves to `saving` and returns the request to send.
    pub fn begin_save(
        &mut self,
        trigger: SaveTrigger,
        validate: bool,
    ) -> EditorResult<Option<SaveTicket>> {
        if matches!(self.state, SaveState::Saving { .. }) {
            return Err(EditorError::Busy);
        }

        if validate {
            validate_required(self.history.current())?;
        }

        if !self.dirty {
            return Ok(None);
        }

        self.state = SaveState::Saving {
            revision: self.revision,
        };

        Ok(Some(SaveTicket {
            request_id: Uuid::new_v4(),
            listing_id: self.listing_id,
            revision: self.revision,
            trigger,
            draft: self.history.current().clone(),
        }))
    }

    /// Apply the store's response to `ticket`.
    pub fn complete_save(
        &mut self,
        ticket: &SaveTicket,
        result: Result<ListingDraft, PersistenceError>,
    ) -> SaveOutcome {
        match result {
            Ok(_) if ticket.revision == self.revision => {
                let at = Utc::now();
                self.dirty = false;
                self.last_saved = Some(at);
                self.last_error = None;
                self.state = SaveState::Saved {
                    revision: ticket.revision,
                    at,
                };
                SaveOutcome::Saved {
                    revision: ticket.revision,
                    at,
                }
            }
            Ok(_) => {
                self.state = SaveState::Idle;
                SaveOutcome::StaleResponseIgnored {
                    saved_revision: ticket.revision,
                    current_revision: self.revision,
                }
            }
            Err(error) => {
                self.last_error = Some(error.clone());
                self.state = SaveState::Error {
                    revision: ticket.revision,
                    error: error.clone(),
                    at: Utc::now(),
                };
                SaveOutcome::Failed(error)
            }
        }
    }

    /// Give up on the in-flight save without a response. The draft stays
    /// dirty so a later save picks it up. Returns `false` if nothing was in
    /// flight.
    pub fn abort_save(&mut self) -> bool {
        if !matches!(self.state, SaveState::Saving { .. }) {
            return false;
        }
        self.state = SaveState::Idle;
        true
    }

    /// Return a `saved` or `error` banner state to `idle`, but only if the
    /// state is still exactly `expected`. Expiring an error banner also
    /// clears `last_error`; the draft stays dirty.
    pub fn expire_banner(&mut self, expected: &SaveState) -> bool {
        if self.state != *expected {
            return false;
        }
        match self.state {
            SaveState::Saved { .. } => {}
            SaveState::Error { .. } => self.last_error = None,
            SaveState::Idle | SaveState::Saving { .. } => return false,
        }
        self.state = SaveState::Idle;
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_listing() -> ListingDraft {
        ListingDraft {
            title: "Bahçeli Müstakil Ev".into(),
            slug: "bahceli-mustakil-ev".into(),
            property_type: "house".into(),
            location: "Çeşme, İzmir".into(),
            price: Some(9_800_000.0),
            ..Default::default()
        }
    }

    fn network_error() -> PersistenceError {
        PersistenceError::Network {
            message: "connection reset".into(),
        }
    }

    #[test]
    fn new_controller_is_clean_and_idle() {
        let controller = DraftController::new(1, valid_listing(), None);
        let status = controller.status();
        assert!(!status.dirty);
        assert_eq!(status.revision, 0);
        assert_eq!(status.state, SaveState::Idle);
        assert_eq!(status.label(), "idle");
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn mutate_marks_dirty_and_bumps_revision() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        assert!(controller.mutate(&ListingPatch::new().price(Some(9_500_000.0))).unwrap());

        assert!(controller.is_dirty());
        assert_eq!(controller.revision(), 1);
        assert_eq!(controller.status().label(), "pending");
    }

    #[test]
    fn noop_mutate_changes_nothing() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        assert!(!controller.mutate(&ListingPatch::new()).unwrap());
        assert!(!controller.mutate(&ListingPatch::new().location("Çeşme, İzmir")).unwrap());

        assert!(!controller.is_dirty());
        assert_eq!(controller.revision(), 0);
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn undo_and_redo_mark_dirty() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        controller.mutate(&ListingPatch::new().featured(true)).unwrap();
        let ticket = controller.begin_save(SaveTrigger::Manual, true).unwrap().unwrap();
        controller.complete_save(&ticket, Ok(ticket.draft.clone()));
        assert!(!controller.is_dirty());

        assert!(controller.undo());
        assert!(controller.is_dirty());
        assert_eq!(controller.revision(), 2);

        assert!(controller.redo());
        assert_eq!(controller.revision(), 3);
        assert!(!controller.redo());
        assert_eq!(controller.revision(), 3);
    }

    #[test]
    fn begin_save_rejects_while_in_flight() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        controller.mutate(&ListingPatch::new().published(true)).unwrap();

        let _ticket = controller.begin_save(SaveTrigger::Autosave, false).unwrap();
        assert_matches!(
            controller.begin_save(SaveTrigger::Manual, true),
            Err(EditorError::Busy)
        );
    }

    #[test]
    fn abort_save_releases_in_flight_state_and_keeps_dirty() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        assert!(!controller.abort_save());

        controller.mutate(&ListingPatch::new().published(true)).unwrap();
        let _ticket = controller.begin_save(SaveTrigger::Manual, true).unwrap();
        assert!(controller.abort_save());

        assert_eq!(*controller.state(), SaveState::Idle);
        assert!(controller.is_dirty());
        assert_matches!(
            controller.begin_save(SaveTrigger::Manual, true),
            Ok(Some(ticket)) if ticket.revision == 1
        );
    }

    #[test]
    fn non_finite_price_is_rejected_without_history_entry() {
        let mut controller = DraftController::new(1, valid_listing(), None);

        assert_matches!(
            controller.mutate(&ListingPatch::new().price(Some(f64::NAN))),
            Err(CoreError::Validation(_))
        );
        assert_eq!(controller.history().len(), 1);
        assert_eq!(controller.revision(), 0);
        assert!(!controller.is_dirty());
    }

    #[test]
    fn empty_patch_is_noop_even_with_nan_loaded_price() {
        let loaded = ListingDraft {
            price: Some(f64::NAN),
            ..valid_listing()
        };
        let mut controller = DraftController::new(1, loaded, None);

        assert!(!controller.mutate(&ListingPatch::new()).unwrap());
        assert!(!controller.mutate(&ListingPatch::new().title("Bahçeli Müstakil Ev")).unwrap());
        assert_eq!(controller.history().len(), 1);
        assert!(!controller.is_dirty());
    }

    #[test]
    fn begin_save_on_clean_draft_returns_none() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        assert_matches!(controller.begin_save(SaveTrigger::Manual, true), Ok(None));
        assert_eq!(*controller.state(), SaveState::Idle);
    }

    #[test]
    fn validation_runs_before_dirty_check() {
        let mut controller = DraftController::new(1, ListingDraft::default(), None);
        let err = controller.begin_save(SaveTrigger::Manual, true).unwrap_err();
        assert_matches!(err, EditorError::Validation(errors) if errors.len() == 4);
        assert_eq!(*controller.state(), SaveState::Idle);
    }

    #[test]
    fn unvalidated_save_accepts_partial_draft() {
        let mut controller = DraftController::new(1, ListingDraft::default(), None);
        controller.mutate(&ListingPatch::new().title("Yarım")).unwrap();
        let ticket = controller
            .begin_save(SaveTrigger::Autosave, false)
            .unwrap()
            .expect("dirty draft should produce a ticket");
        assert_eq!(ticket.draft.slug, "yarim");
        assert_eq!(ticket.revision, 1);
    }

    #[test]
    fn edit_during_save_keeps_saving_state() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        controller.mutate(&ListingPatch::new().title("A")).unwrap();
        controller.begin_save(SaveTrigger::Autosave, false).unwrap();

        controller.mutate(&ListingPatch::new().title("B")).unwrap();
        assert_eq!(*controller.state(), SaveState::Saving { revision: 1 });
        assert!(controller.status().saving);
    }

    #[test]
    fn failure_keeps_dirty_and_records_error() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        controller.mutate(&ListingPatch::new().title("A")).unwrap();
        let ticket = controller.begin_save(SaveTrigger::Manual, true).unwrap().unwrap();

        let outcome = controller.complete_save(&ticket, Err(network_error()));

        assert_eq!(outcome, SaveOutcome::Failed(network_error()));
        let status = controller.status();
        assert!(status.dirty);
        assert_eq!(status.last_error, Some(network_error()));
        assert_eq!(status.last_saved, None);
        assert_eq!(status.label(), "error");
    }

    #[test]
    fn success_clears_previous_error() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        controller.mutate(&ListingPatch::new().title("A")).unwrap();
        let first = controller.begin_save(SaveTrigger::Manual, true).unwrap().unwrap();
        controller.complete_save(&first, Err(network_error()));

        let retry = controller.begin_save(SaveTrigger::Manual, true).unwrap().unwrap();
        let outcome = controller.complete_save(&retry, Ok(retry.draft.clone()));

        assert_matches!(outcome, SaveOutcome::Saved { revision: 1, .. });
        let status = controller.status();
        assert!(!status.dirty);
        assert!(status.last_error.is_none());
        assert!(status.last_saved.is_some());
    }

    #[test]
    fn banner_expires_only_from_expected_state() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        controller.mutate(&ListingPatch::new().title("A")).unwrap();
        let ticket = controller.begin_save(SaveTrigger::Manual, true).unwrap().unwrap();
        controller.complete_save(&ticket, Ok(ticket.draft.clone()));
        let saved = controller.state().clone();

        controller.mutate(&ListingPatch::new().title("B")).unwrap();
        assert!(!controller.expire_banner(&saved));
        assert_eq!(*controller.state(), SaveState::Idle);
    }

    #[test]
    fn error_banner_expiry_clears_last_error_but_not_dirty() {
        let mut controller = DraftController::new(1, valid_listing(), None);
        controller.mutate(&ListingPatch::new().title("A")).unwrap();
        let ticket = controller.begin_save(SaveTrigger::Manual, true).unwrap().unwrap();
        controller.complete_save(&ticket, Err(network_error()));
        let failed = controller.state().clone();

        assert!(controller.expire_banner(&failed));
        let status = controller.status();
        assert_eq!(status.state, SaveState::Idle);
        assert!(status.last_error.is_none());
        assert!(status.dirty);
        assert_eq!(status.label(), "pending");
    }

    #[test]
    fn move_image_goes_through_history() {
        let mut listing = valid_listing();
        listing.images = vec![
            emlak_core::listing::ListingImage::new("salon.jpg"),
            emlak_core::listing::ListingImage::new("mutfak.jpg"),
        ];
        let mut controller = DraftController::new(1, listing, None);

        assert_eq!(controller.move_image(1, 0), Ok(true));
        assert_eq!(controller.current_draft().images[0].url, "mutfak.jpg");
        assert!(controller.can_undo());

        assert_eq!(controller.move_image(0, 0), Ok(false));
        assert_matches!(
            controller.move_image(0, 5),
            Err(CoreError::ImageIndexOutOfRange { index: 5, len: 2 })
        );
    }

    #[test]
    fn status_serializes_for_the_ui() {
        let controller = DraftController::new(1, valid_listing(), None);
        let json = serde_json::to_value(controller.status()).unwrap();
        assert_eq!(json["state"]["state"], "idle");
        assert_eq!(json["dirty"], false);
        assert_eq!(json["can_undo"], false);
    }
}
