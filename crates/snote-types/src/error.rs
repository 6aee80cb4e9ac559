use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid blob id {value:?}: {reason}")]
    InvalidBlobId { value: String, reason: String },

    #[error("invalid note id {id:?}: {reason}")]
    InvalidNoteId { id: String, reason: String },

    #[error("note id is reserved: {0}")]
    ReservedNoteId(String),
}
