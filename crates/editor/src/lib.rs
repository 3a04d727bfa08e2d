//! `emlak-editor` library crate.
//!
//! The listing editor's draft state: a synchronous [`controller`] owning the
//! undo history and save state machine, and an async [`session`] that drives
//! it with debounced autosave against a [`store::ListingStore`]. The binary
//! entrypoint in `main.rs` replays [`script`] files against an in-memory
//! store.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod script;
pub mod session;
pub mod store;
