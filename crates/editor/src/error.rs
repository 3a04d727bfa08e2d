use emlak_core::error::CoreError;
use emlak_core::validation::FieldErrors;

use crate::store::PersistenceError;

/// Errors returned by editor operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// The draft fails the required-field policy. Nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] FieldErrors),

    /// A save is already in flight on this controller.
    #[error("A save is already in progress")]
    Busy,

    /// The store rejected the save. The draft stays dirty.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The save task ended without recording a response (it panicked or the
    /// runtime shut down). The draft stays dirty.
    #[error("Save interrupted: {0}")]
    Interrupted(String),

    /// A domain rule was violated (e.g. an image index out of range).
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for editor results.
pub type EditorResult<T> = Result<T, EditorError>;
