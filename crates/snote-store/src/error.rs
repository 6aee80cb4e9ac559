use snote_types::{BlobId, TypeError};

/// Errors from note and blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No note with the given ID exists.
    #[error("note not found: {0}")]
    NoteNotFound(String),

    /// No blob with the given ID exists.
    #[error("blob not found: {0}")]
    BlobNotFound(BlobId),

    /// A stored note could not be parsed.
    #[error("corrupt note {id}: {reason}")]
    CorruptNote { id: String, reason: String },

    /// A blob's bytes no longer hash to its ID.
    #[error("hash mismatch for blob {id}: computed {computed}")]
    HashMismatch { id: BlobId, computed: BlobId },

    /// The note ID is not storable.
    #[error(transparent)]
    InvalidNoteId(#[from] TypeError),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a backend client (bucket, poisoned lock).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// `true` for [`StoreError::NoteNotFound`] and [`StoreError::BlobNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoteNotFound(_) | Self::BlobNotFound(_))
    }

    /// `true` when the stored data itself is bad rather than unreachable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptNote { .. } | Self::HashMismatch { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(StoreError::NoteNotFound("x".into()).is_not_found());
        assert!(StoreError::BlobNotFound(BlobId::compute(b"x")).is_not_found());
        assert!(!StoreError::Backend("down".into()).is_not_found());

        let corrupt = StoreError::CorruptNote {
            id: "x".into(),
            reason: "eof".into(),
        };
        assert!(corrupt.is_corrupt());
        assert!(!corrupt.is_not_found());
    }

    #[test]
    fn display_includes_id() {
        let err = StoreError::NoteNotFound("groceries".into());
        assert_eq!(err.to_string(), "note not found: groceries");
    }
}
