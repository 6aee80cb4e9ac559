use std::collections::{BTreeSet, HashMap};
use std::io::Cursor;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use snote_types::{validate_note_id, BlobId, Note};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobReader, BlobStore, NoteStore};

/// In-memory, HashMap-based note and blob store.
///
/// Intended for tests and embedding. Notes and blobs live behind `RwLock`s
/// for safe concurrent access; data is lost when the store is dropped.
pub struct InMemoryStorage {
    notes: RwLock<HashMap<String, Note>>,
    blobs: RwLock<HashMap<BlobId, Bytes>>,
}

fn read_lock<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
}

fn write_lock<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
}

impl InMemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(HashMap::new()),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of notes currently stored.
    pub fn note_count(&self) -> usize {
        self.notes.read().map(|m| m.len()).unwrap_or_default()
    }

    /// Number of blobs currently stored.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().map(|m| m.len()).unwrap_or_default()
    }

    /// Insert bytes under an arbitrary ID without hashing them.
    ///
    /// Bypasses content addressing; used to simulate corruption and blobs
    /// written under a foreign digest.
    pub fn insert_unchecked(&self, id: BlobId, data: impl Into<Bytes>) -> StoreResult<()> {
        write_lock(&self.blobs)?.insert(id, data.into());
        Ok(())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("note_count", &self.note_count())
            .field("blob_count", &self.blob_count())
            .finish()
    }
}

#[async_trait]
impl NoteStore for InMemoryStorage {
    async fn load_note(&self, id: &str) -> StoreResult<Note> {
        read_lock(&self.notes)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NoteNotFound(id.to_string()))
    }

    async fn save_note(&self, mut note: Note) -> StoreResult<Note> {
        validate_note_id(&note.id)?;
        note.last_edit = Utc::now();
        write_lock(&self.notes)?.insert(note.id.clone(), note.clone());
        Ok(note)
    }

    async fn delete_note(&self, id: &str) -> StoreResult<()> {
        write_lock(&self.notes)?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NoteNotFound(id.to_string()))
    }

    async fn list_note_ids(&self) -> StoreResult<BTreeSet<String>> {
        Ok(read_lock(&self.notes)?.keys().cloned().collect())
    }
}

#[async_trait]
impl BlobStore for InMemoryStorage {
    async fn put_blob(&self, data: &[u8]) -> StoreResult<BlobId> {
        let id = BlobId::compute(data);
        write_lock(&self.blobs)?
            .entry(id.clone())
            .or_insert_with(|| Bytes::copy_from_slice(data));
        Ok(id)
    }

    async fn get_blob(&self, id: &BlobId) -> StoreResult<BlobReader> {
        let data = read_lock(&self.blobs)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(id.clone()))?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn blob_exists(&self, id: &BlobId) -> StoreResult<bool> {
        Ok(read_lock(&self.blobs)?.contains_key(id))
    }

    async fn delete_blob(&self, id: &BlobId) -> StoreResult<()> {
        write_lock(&self.blobs)?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::BlobNotFound(id.clone()))
    }

    async fn list_blob_ids(&self) -> StoreResult<BTreeSet<BlobId>> {
        Ok(read_lock(&self.blobs)?.keys().cloned().collect())
    }
}
