use std::collections::BTreeSet;
use std::pin::Pin;

use async_trait::async_trait;
use snote_types::{BlobHasher, BlobId, Note};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{StoreError, StoreResult};

/// Streaming handle to a blob's bytes.
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

/// Chunk size used when copying or hashing streamed blob data.
pub(crate) const COPY_CHUNK: usize = 64 * 1024;

/// Durable storage for notes keyed by their caller-chosen ID.
///
/// All implementations must satisfy these invariants:
/// - `save_note` replaces the whole note atomically. A crash or a concurrent save
///   never leaves an unparsable note behind; concurrent saves to the same ID
///   resolve as last writer wins.
/// - `save_note` stamps `last_edit` itself and returns the note as stored.
/// - `list_note_ids` returns exactly the IDs saved and not since deleted.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Read one note.
    ///
    /// Fails with `NoteNotFound` if absent and `CorruptNote` if the stored
    /// bytes cannot be parsed.
    async fn load_note(&self, id: &str) -> StoreResult<Note>;

    /// Persist the full note, overwriting any note with the same ID.
    async fn save_note(&self, note: Note) -> StoreResult<Note>;

    /// Remove a note. Fails with `NoteNotFound` if absent.
    async fn delete_note(&self, id: &str) -> StoreResult<()>;

    /// Every note ID currently stored.
    async fn list_note_ids(&self) -> StoreResult<BTreeSet<String>>;

    /// Check whether a note exists.
    async fn note_exists(&self, id: &str) -> StoreResult<bool> {
        match self.load_note(id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Immutable, content-addressed blob storage.
///
/// There is no update-in-place operation: an object is written once under
/// the digest of its bytes and only ever deleted afterwards. This is what
/// makes concurrent deduplication and garbage collection safe without
/// per-object locks.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` unless an object with its ID already exists.
    ///
    /// Returns `BlobId::compute(data)` either way.
    async fn put_blob(&self, data: &[u8]) -> StoreResult<BlobId>;

    /// Store everything `reader` yields and return its ID.
    ///
    /// The default buffers the stream and delegates to [`put_blob`](Self::put_blob).
    /// Backends with a cheaper streaming path override it.
    async fn put_blob_reader(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StoreResult<BlobId> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.put_blob(&data).await
    }

    /// Open a blob for streaming. Fails with `BlobNotFound` if absent.
    async fn get_blob(&self, id: &BlobId) -> StoreResult<BlobReader>;

    /// Check whether a blob exists.
    async fn blob_exists(&self, id: &BlobId) -> StoreResult<bool>;

    /// Delete a blob. Fails with `BlobNotFound` if absent.
    async fn delete_blob(&self, id: &BlobId) -> StoreResult<()>;

    /// Every blob ID currently stored.
    async fn list_blob_ids(&self) -> StoreResult<BTreeSet<BlobId>>;

    /// Re-read a blob and check that its bytes still hash to `id`.
    ///
    /// Returns the blob size on success and `HashMismatch` on corruption.
    async fn verify_blob(&self, id: &BlobId) -> StoreResult<u64> {
        let mut reader = self.get_blob(id).await?;
        let mut hasher = BlobHasher::new();
        let mut buf = vec![0u8; COPY_CHUNK];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let computed = hasher.finalize();
        if computed != *id {
            return Err(StoreError::HashMismatch {
                id: id.clone(),
                computed,
            });
        }
        Ok(hasher.len())
    }
}
