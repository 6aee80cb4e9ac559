//! Object-storage backend.
//!
//! [`BucketStorage`] maps notes and blobs onto flat object keys:
//!
//! ```text
//! <prefix>notes/<note-id>.json
//! <prefix>blobs/<blob-id>
//! ```
//!
//! Object stores replace whole objects atomically on put, so note saves need
//! no temporary-object dance. The [`Bucket`] trait is the minimal client
//! surface the layout needs; [`InMemoryBucket`] is the reference client.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use snote_types::{validate_note_id, BlobId, Note};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobReader, BlobStore, NoteStore};

const NOTES_DIR: &str = "notes/";
const BLOBS_DIR: &str = "blobs/";
const NOTE_EXTENSION: &str = ".json";

/// Minimal object-storage client.
///
/// Client failures are reported as [`StoreError::Backend`].
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Create or replace the object at `key`.
    async fn put_object(&self, key: &str, data: Bytes) -> StoreResult<()>;

    /// Fetch the object at `key`, `None` if absent.
    async fn get_object(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Check whether an object exists at `key`.
    async fn head_object(&self, key: &str) -> StoreResult<bool>;

    /// Delete the object at `key`. Returns `true` if it existed.
    async fn delete_object(&self, key: &str) -> StoreResult<bool>;

    /// All keys starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// In-process [`Bucket`] holding objects in a `BTreeMap`.
#[derive(Debug, Default)]
pub struct InMemoryBucket {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl InMemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in the bucket.
    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(format!("lock poisoned: {e}"))
}

#[async_trait]
impl Bucket for InMemoryBucket {
    async fn put_object(&self, key: &str, data: Bytes) -> StoreResult<()> {
        self.objects
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StoreResult<Option<Bytes>> {
        Ok(self.objects.read().map_err(poisoned)?.get(key).cloned())
    }

    async fn head_object(&self, key: &str) -> StoreResult<bool> {
        Ok(self.objects.read().map_err(poisoned)?.contains_key(key))
    }

    async fn delete_object(&self, key: &str) -> StoreResult<bool> {
        Ok(self.objects.write().map_err(poisoned)?.remove(key).is_some())
    }

    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .map_err(poisoned)?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// Note and blob store over any [`Bucket`].
pub struct BucketStorage<B> {
    bucket: B,
    prefix: String,
}

impl<B: Bucket> BucketStorage<B> {
    /// Store objects at the top level of `bucket`.
    pub fn new(bucket: B) -> Self {
        Self::with_prefix(bucket, "")
    }

    /// Store objects under `prefix` (e.g. `"snote/"`), sharing the bucket.
    pub fn with_prefix(bucket: B, prefix: impl Into<String>) -> Self {
        Self {
            bucket,
            prefix: prefix.into(),
        }
    }

    pub fn bucket(&self) -> &B {
        &self.bucket
    }

    fn notes_prefix(&self) -> String {
        format!("{}{NOTES_DIR}", self.prefix)
    }

    fn blobs_prefix(&self) -> String {
        format!("{}{BLOBS_DIR}", self.prefix)
    }

    fn note_key(&self, id: &str) -> StoreResult<String> {
        validate_note_id(id)?;
        Ok(format!("{}{id}{NOTE_EXTENSION}", self.notes_prefix()))
    }

    fn blob_key(&self, id: &BlobId) -> String {
        format!("{}{id}", self.blobs_prefix())
    }
}

#[async_trait]
impl<B: Bucket> NoteStore for BucketStorage<B> {
    async fn load_note(&self, id: &str) -> StoreResult<Note> {
        let data = self
            .bucket
            .get_object(&self.note_key(id)?)
            .await?
            .ok_or_else(|| StoreError::NoteNotFound(id.to_string()))?;
        let note: Note = serde_json::from_slice(&data).map_err(|e| StoreError::CorruptNote {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        if note.id != id {
            return Err(StoreError::CorruptNote {
                id: id.to_string(),
                reason: format!("object holds note {:?}", note.id),
            });
        }
        Ok(note)
    }

    async fn save_note(&self, mut note: Note) -> StoreResult<Note> {
        let key = self.note_key(&note.id)?;
        note.last_edit = Utc::now();
        let json = serde_json::to_vec(&note).map_err(|e| StoreError::CorruptNote {
            id: note.id.clone(),
            reason: e.to_string(),
        })?;
        self.bucket.put_object(&key, Bytes::from(json)).await?;
        debug!(note_id = %note.id, key = %key, "bucket_storage: saved note");
        Ok(note)
    }

    async fn delete_note(&self, id: &str) -> StoreResult<()> {
        if self.bucket.delete_object(&self.note_key(id)?).await? {
            Ok(())
        } else {
            Err(StoreError::NoteNotFound(id.to_string()))
        }
    }

    async fn list_note_ids(&self) -> StoreResult<BTreeSet<String>> {
        let prefix = self.notes_prefix();
        let keys = self.bucket.list_keys(&prefix).await?;
        Ok(keys
            .iter()
            .filter_map(|k| k.strip_prefix(&prefix)?.strip_suffix(NOTE_EXTENSION))
            .filter(|id| validate_note_id(id).is_ok())
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl<B: Bucket> BlobStore for BucketStorage<B> {
    async fn put_blob(&self, data: &[u8]) -> StoreResult<BlobId> {
        let id = BlobId::compute(data);
        let key = self.blob_key(&id);
        if !self.bucket.head_object(&key).await? {
            self.bucket
                .put_object(&key, Bytes::copy_from_slice(data))
                .await?;
            debug!(blob_id = %id, size = data.len(), "bucket_storage: stored blob");
        }
        Ok(id)
    }

    async fn get_blob(&self, id: &BlobId) -> StoreResult<BlobReader> {
        let data = self
            .bucket
            .get_object(&self.blob_key(id))
            .await?
            .ok_or_else(|| StoreError::BlobNotFound(id.clone()))?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn blob_exists(&self, id: &BlobId) -> StoreResult<bool> {
        self.bucket.head_object(&self.blob_key(id)).await
    }

    async fn delete_blob(&self, id: &BlobId) -> StoreResult<()> {
        if self.bucket.delete_object(&self.blob_key(id)).await? {
            Ok(())
        } else {
            Err(StoreError::BlobNotFound(id.clone()))
        }
    }

    async fn list_blob_ids(&self) -> StoreResult<BTreeSet<BlobId>> {
        let prefix = self.blobs_prefix();
        let keys = self.bucket.list_keys(&prefix).await?;
        Ok(keys
            .iter()
            .filter_map(|k| BlobId::parse(k.strip_prefix(&prefix)?).ok())
            .collect())
    }
}
