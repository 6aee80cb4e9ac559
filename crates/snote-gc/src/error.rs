use std::fmt;

use serde::{Deserialize, Serialize};
use snote_refs::ExtractError;
use snote_store::StoreError;
use thiserror::Error;

/// Step of a collection pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcPhase {
    CollectNoteIds,
    ExtractReferences,
    CollectBlobIds,
    Diff,
    Delete,
}

impl fmt::Display for GcPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CollectNoteIds => "collect_note_ids",
            Self::ExtractReferences => "extract_references",
            Self::CollectBlobIds => "collect_blob_ids",
            Self::Diff => "diff",
            Self::Delete => "delete",
        })
    }
}

/// Why a collection pass stopped early.
#[derive(Debug, Error)]
pub enum GcError {
    /// A store call failed.
    #[error("gc aborted in {phase}: {source}")]
    Store {
        phase: GcPhase,
        #[source]
        source: StoreError,
    },

    /// A note's contents could not be scanned for references.
    #[error("gc aborted: cannot extract references from note {note_id}: {source}")]
    Extract {
        note_id: String,
        #[source]
        source: ExtractError,
    },

    /// Notes exist but none references any blob.
    #[error("gc aborted: {notes} notes reference no blobs, refusing to delete")]
    EmptyReferenceSet { notes: usize },

    /// A deletion failed after `deleted` blobs were already removed.
    #[error("gc aborted after deleting {deleted} blobs: {source}")]
    Delete {
        deleted: usize,
        #[source]
        source: StoreError,
    },
}

impl GcError {
    /// Phase in which the pass stopped.
    pub fn phase(&self) -> GcPhase {
        match self {
            Self::Store { phase, .. } => *phase,
            Self::Extract { .. } => GcPhase::ExtractReferences,
            Self::EmptyReferenceSet { .. } => GcPhase::Diff,
            Self::Delete { .. } => GcPhase::Delete,
        }
    }
}

/// Result alias for collection passes.
pub type GcResult<T> = Result<T, GcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_display_snake_case() {
        assert_eq!(GcPhase::CollectNoteIds.to_string(), "collect_note_ids");
        assert_eq!(
            serde_json::to_string(&GcPhase::ExtractReferences).unwrap(),
            "\"extract_references\""
        );
    }

    #[test]
    fn errors_know_their_phase() {
        let gate = GcError::EmptyReferenceSet { notes: 3 };
        assert_eq!(gate.phase(), GcPhase::Diff);
        assert!(gate.to_string().contains("refusing to delete"));

        let store = GcError::Store {
            phase: GcPhase::CollectBlobIds,
            source: StoreError::Backend("down".into()),
        };
        assert_eq!(store.phase(), GcPhase::CollectBlobIds);
    }
}
