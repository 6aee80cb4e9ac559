use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use snote_types::{validate_note_id, BlobHasher, BlobId, Note};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobReader, BlobStore, NoteStore, COPY_CHUNK};

const NOTE_EXTENSION: &str = ".json";
const BLOB_DIR: &str = "blobs";

/// Filesystem-backed note and blob store.
///
/// Layout:
/// ```text
/// <root>/<note-id>.json      one JSON document per note
/// <root>/blobs/<blob-id>     raw uploaded bytes, named by their digest
/// ```
///
/// Writes go to a uniquely named hidden temporary file in the destination
/// directory and are renamed into place, so readers only ever observe a
/// complete old or complete new file. Temporary files start with `.` and are
/// never listed.
#[derive(Clone, Debug)]
pub struct DiskStorage {
    root: PathBuf,
    blobs: PathBuf,
}

impl DiskStorage {
    /// Open (or create) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let blobs = root.join(BLOB_DIR);
        fs::create_dir_all(&blobs).await.map_err(|e| {
            warn!(root = %root.display(), error = %e, "disk_storage: create_dir_all failed");
            e
        })?;
        Ok(Self { root, blobs })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn note_path(&self, id: &str) -> StoreResult<PathBuf> {
        validate_note_id(id)?;
        Ok(self.root.join(format!("{id}{NOTE_EXTENSION}")))
    }

    fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.blobs.join(id.as_str())
    }
}

/// A fresh hidden path next to `target`, unique per call.
fn temp_path_for(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!(".{label}.{}.tmp", uuid::Uuid::now_v7().simple()))
}

/// Write `data` to `target` through a temporary file and an atomic rename.
async fn write_atomic(target: &Path, data: &[u8]) -> StoreResult<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let label = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("note");
    let temp = temp_path_for(dir, label);

    let result = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, target).await
    }
    .await;

    if let Err(e) = result {
        warn!(target = %target.display(), error = %e, "disk_storage: atomic write failed");
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Move a fully written temporary blob to its content address.
///
/// If the object already exists the temporary copy is discarded; content
/// addressing guarantees the existing bytes are identical.
async fn publish_blob(temp: &Path, target: &Path) -> StoreResult<()> {
    if fs::try_exists(target).await? {
        fs::remove_file(temp).await?;
        return Ok(());
    }
    if let Err(e) = fs::rename(temp, target).await {
        let _ = fs::remove_file(temp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl NoteStore for DiskStorage {
    async fn load_note(&self, id: &str) -> StoreResult<Note> {
        let path = self.note_path(id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NoteNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let note: Note = serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptNote {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        if note.id != id {
            return Err(StoreError::CorruptNote {
                id: id.to_string(),
                reason: format!("file holds note {:?}", note.id),
            });
        }
        Ok(note)
    }

    async fn save_note(&self, mut note: Note) -> StoreResult<Note> {
        let path = self.note_path(&note.id)?;
        note.last_edit = Utc::now();
        let json = serde_json::to_vec(&note).map_err(|e| StoreError::CorruptNote {
            id: note.id.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&path, &json).await?;
        debug!(note_id = %note.id, bytes = json.len(), "disk_storage: saved note");
        Ok(note)
    }

    async fn delete_note(&self, id: &str) -> StoreResult<()> {
        let path = self.note_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NoteNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_note_ids(&self) -> StoreResult<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|n| n.strip_suffix(NOTE_EXTENSION)) else {
                continue;
            };
            if validate_note_id(id).is_ok() {
                ids.insert(id.to_string());
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl BlobStore for DiskStorage {
    async fn put_blob(&self, data: &[u8]) -> StoreResult<BlobId> {
        let id = BlobId::compute(data);
        let target = self.blob_path(&id);
        if fs::try_exists(&target).await? {
            debug!(blob_id = %id, "disk_storage: blob already stored");
            return Ok(id);
        }
        let temp = temp_path_for(&self.blobs, "upload");
        let written = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        publish_blob(&temp, &target).await?;
        debug!(blob_id = %id, size = data.len(), "disk_storage: stored blob");
        Ok(id)
    }

    async fn put_blob_reader(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StoreResult<BlobId> {
        let temp = temp_path_for(&self.blobs, "upload");
        let mut hasher = BlobHasher::new();

        let copied = async {
            let mut file = fs::File::create(&temp).await?;
            let mut buf = vec![0u8; COPY_CHUNK];
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                file.write_all(&buf[..n]).await?;
            }
            file.sync_all().await
        }
        .await;
        if let Err(e) = copied {
            warn!(error = %e, "disk_storage: streamed upload failed");
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        let id = hasher.finalize();
        publish_blob(&temp, &self.blob_path(&id)).await?;
        debug!(blob_id = %id, size = hasher.len(), "disk_storage: stored streamed blob");
        Ok(id)
    }

    async fn get_blob(&self, id: &BlobId) -> StoreResult<BlobReader> {
        match fs::File::open(self.blob_path(id)).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::BlobNotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn blob_exists(&self, id: &BlobId) -> StoreResult<bool> {
        Ok(fs::try_exists(self.blob_path(id)).await?)
    }

    async fn delete_blob(&self, id: &BlobId) -> StoreResult<()> {
        match fs::remove_file(self.blob_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::BlobNotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_blob_ids(&self) -> StoreResult<BTreeSet<BlobId>> {
        let mut ids = BTreeSet::new();
        let mut entries = fs::read_dir(&self.blobs).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|n| BlobId::parse(n).ok()) {
                ids.insert(id);
            }
        }
        Ok(ids)
    }
}
