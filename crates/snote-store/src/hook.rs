use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use snote_types::Note;
use tracing::trace;

use crate::error::StoreResult;
use crate::traits::NoteStore;

/// Callback run after a note write has been made durable.
///
/// Hooks must not fail the write that triggered them and must not block;
/// derived state (render caches, indexes) uses them to drop stale entries.
pub trait WriteHook: Send + Sync {
    /// Called after `note` was saved. `note` is the stored version.
    fn after_save(&self, note: &Note);

    /// Called after the note `id` was deleted.
    fn after_delete(&self, id: &str);
}

/// [`NoteStore`] wrapper that notifies [`WriteHook`]s after each successful
/// save or delete. Failed writes notify nobody.
pub struct HookedNoteStore {
    inner: Arc<dyn NoteStore>,
    hooks: Vec<Arc<dyn WriteHook>>,
}

impl HookedNoteStore {
    pub fn new(inner: Arc<dyn NoteStore>) -> Self {
        Self {
            inner,
            hooks: Vec::new(),
        }
    }

    /// Register another hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn WriteHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Arc<dyn NoteStore> {
        &self.inner
    }
}

#[async_trait]
impl NoteStore for HookedNoteStore {
    async fn load_note(&self, id: &str) -> StoreResult<Note> {
        self.inner.load_note(id).await
    }

    async fn save_note(&self, note: Note) -> StoreResult<Note> {
        let saved = self.inner.save_note(note).await?;
        trace!(note_id = %saved.id, hooks = self.hooks.len(), "hooked_store: after_save");
        for hook in &self.hooks {
            hook.after_save(&saved);
        }
        Ok(saved)
    }

    async fn delete_note(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_note(id).await?;
        trace!(note_id = %id, hooks = self.hooks.len(), "hooked_store: after_delete");
        for hook in &self.hooks {
            hook.after_delete(id);
        }
        Ok(())
    }

    async fn list_note_ids(&self) -> StoreResult<BTreeSet<String>> {
        self.inner.list_note_ids().await
    }

    async fn note_exists(&self, id: &str) -> StoreResult<bool> {
        self.inner.note_exists(id).await
    }
}
