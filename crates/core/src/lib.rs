//! `emlak-core`: pure listing-draft logic.
//!
//! Everything in this crate is synchronous and free of I/O so that the
//! editor runtime, the demo binary and tests share one definition of what a
//! listing draft is, how patches merge, and what counts as a valid listing.

pub mod error;
pub mod history;
pub mod listing;
pub mod slug;
pub mod types;
pub mod validation;
