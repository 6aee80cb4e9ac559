use std::collections::{BTreeMap, BTreeSet};

use snote_store::{NoteStore, StoreResult};
use snote_types::Note;
use tracing::debug;

/// Mapping from tag to the IDs of the notes carrying it.
///
/// A cache over the note store, never a source of truth: [`TagIndex::build`]
/// recreates it from scratch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagIndex {
    by_tag: BTreeMap<String, BTreeSet<String>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from every note in `store`.
    ///
    /// Notes deleted between listing and loading are skipped.
    pub async fn build(store: &dyn NoteStore) -> StoreResult<Self> {
        let mut index = Self::new();
        for id in store.list_note_ids().await? {
            match store.load_note(&id).await {
                Ok(note) => index.insert(&note),
                Err(e) if e.is_not_found() => {
                    debug!(note_id = %id, "tag_index: note vanished during build");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(index)
    }

    /// Index every note yielded by `notes`.
    pub fn from_notes<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        let mut index = Self::new();
        for note in notes {
            index.insert(note);
        }
        index
    }

    /// Record all of `note`'s tags.
    pub fn insert(&mut self, note: &Note) {
        for tag in &note.tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(note.id.clone());
        }
    }

    /// IDs of the notes tagged `tag`, sorted.
    pub fn notes_with(&self, tag: &str) -> Option<&BTreeSet<String>> {
        self.by_tag.get(tag)
    }

    /// All tags with their note IDs, sorted by tag.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.by_tag.iter().map(|(tag, ids)| (tag.as_str(), ids))
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}
