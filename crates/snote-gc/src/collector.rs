use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use snote_refs::ReferenceExtractor;
use snote_store::{BlobStore, NoteStore};
use snote_types::BlobId;
use tracing::{debug, info, warn};

use crate::error::{GcError, GcPhase, GcResult};

/// What a pass would delete, computed without deleting anything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GcPlan {
    /// Notes whose references were collected.
    pub notes_scanned: usize,
    /// Union of every scanned note's references.
    pub referenced: BTreeSet<BlobId>,
    /// Number of blobs in the store.
    pub stored: usize,
    /// Stored blobs no note references.
    pub unreferenced: BTreeSet<BlobId>,
}

/// Outcome of a completed pass.
#[derive(Clone, Debug, Serialize)]
pub struct GcReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub notes_scanned: usize,
    pub referenced: usize,
    pub stored: usize,
    pub deleted: Vec<BlobId>,
}

/// Reconciles the blob store against the references in all notes.
#[derive(Clone)]
pub struct GarbageCollector {
    notes: Arc<dyn NoteStore>,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn ReferenceExtractor>,
}

impl GarbageCollector {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn ReferenceExtractor>,
    ) -> Self {
        Self {
            notes,
            blobs,
            extractor,
        }
    }

    /// Run every phase up to and including `Diff`.
    ///
    /// Fails exactly when [`run_pass`](Self::run_pass) would abort before
    /// deleting, including on the empty-reference safety gate.
    pub async fn plan(&self) -> GcResult<GcPlan> {
        let note_ids = self
            .notes
            .list_note_ids()
            .await
            .map_err(|source| GcError::Store {
                phase: GcPhase::CollectNoteIds,
                source,
            })?;
        debug!(notes = note_ids.len(), "gc: collected note ids");

        let mut referenced = BTreeSet::new();
        let mut notes_scanned = 0;
        for id in &note_ids {
            let note = match self.notes.load_note(id).await {
                Ok(note) => note,
                Err(e) if e.is_not_found() => {
                    debug!(note_id = %id, "gc: note deleted during scan, skipping");
                    continue;
                }
                Err(source) => {
                    return Err(GcError::Store {
                        phase: GcPhase::ExtractReferences,
                        source,
                    })
                }
            };
            let ids = self
                .extractor
                .blob_ids(&note.contents)
                .map_err(|source| GcError::Extract {
                    note_id: id.clone(),
                    source,
                })?;
            referenced.extend(ids);
            notes_scanned += 1;
        }

        if !note_ids.is_empty() && referenced.is_empty() {
            return Err(GcError::EmptyReferenceSet {
                notes: note_ids.len(),
            });
        }

        let stored = self
            .blobs
            .list_blob_ids()
            .await
            .map_err(|source| GcError::Store {
                phase: GcPhase::CollectBlobIds,
                source,
            })?;

        let unreferenced: BTreeSet<BlobId> = stored.difference(&referenced).cloned().collect();
        debug!(
            referenced = referenced.len(),
            stored = stored.len(),
            unreferenced = unreferenced.len(),
            "gc: diff computed"
        );

        Ok(GcPlan {
            notes_scanned,
            referenced,
            stored: stored.len(),
            unreferenced,
        })
    }

    /// Run one full pass, deleting every unreferenced blob.
    pub async fn run_pass(&self) -> GcResult<GcReport> {
        let started_at = Utc::now();
        let plan = self.plan().await?;

        let mut deleted = Vec::with_capacity(plan.unreferenced.len());
        for id in plan.unreferenced {
            match self.blobs.delete_blob(&id).await {
                Ok(()) => {
                    info!(blob_id = %id, "gc: deleted unreferenced blob");
                }
                Err(e) if e.is_not_found() => {
                    debug!(blob_id = %id, "gc: blob already gone");
                }
                Err(source) => {
                    warn!(blob_id = %id, error = %source, "gc: delete failed, aborting pass");
                    return Err(GcError::Delete {
                        deleted: deleted.len(),
                        source,
                    });
                }
            }
            deleted.push(id);
        }

        Ok(GcReport {
            started_at,
            finished_at: Utc::now(),
            notes_scanned: plan.notes_scanned,
            referenced: plan.referenced.len(),
            stored: plan.stored,
            deleted,
        })
    }
}
