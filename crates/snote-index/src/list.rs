//! The synthetic listing notes.
//!
//! `ls` tabulates every stored note and `lstag` every tag. Both are built on
//! demand from the current store contents and are never saved, so edits to
//! them are discarded on the next request.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::SecondsFormat;
use snote_store::{NoteStore, StoreResult};
use snote_types::Note;
use tracing::debug;

use crate::tags::TagIndex;

/// Tag carried by every synthetic note.
pub const SYSTEM_TAG: &str = "snote/system";

const LS_ID: &str = "ls";
const LSTAG_ID: &str = "lstag";
const AUTOGENERATED: &str = "This note is autogenerated, any user changes to it will be ignored.";

/// Generates the `ls` and `lstag` notes.
#[derive(Clone)]
pub struct ListSynthesizer {
    store: Arc<dyn NoteStore>,
}

impl ListSynthesizer {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// `true` for the IDs this synthesizer serves.
    pub fn is_synthetic(id: &str) -> bool {
        id == LS_ID || id == LSTAG_ID
    }

    /// Generate the synthetic note `id`, or `None` if `id` is not one.
    pub async fn synthesize(&self, id: &str) -> StoreResult<Option<Note>> {
        match id {
            LS_ID => self.all_notes().await.map(Some),
            LSTAG_ID => self.all_tags().await.map(Some),
            _ => Ok(None),
        }
    }

    async fn load_all(&self) -> StoreResult<Vec<Note>> {
        let ids = self.store.list_note_ids().await?;
        let mut notes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.load_note(&id).await {
                Ok(note) => notes.push(note),
                Err(e) if e.is_not_found() => {
                    debug!(note_id = %id, "list_synthesizer: note vanished while listing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(notes)
    }

    /// The `ls` note: one table row per stored note.
    pub async fn all_notes(&self) -> StoreResult<Note> {
        let notes = self.load_all().await?;

        let mut md = String::from("# All notes\n");
        md.push_str(AUTOGENERATED);
        md.push_str("\n\n|title|url|ID|size[B]|tags|last edit|visibility|\n");
        md.push_str("|---|---|---|---|---|---|---|\n");
        for note in &notes {
            let tags: Vec<&str> = note.tags.iter().map(String::as_str).collect();
            let _ = writeln!(
                md,
                "|{}|[{url}]({url})|{}|{}|{}|{}|{}|",
                escape_cell(&note.title),
                escape_cell(&note.id),
                note.content_size(),
                escape_cell(&tags.join(", ")),
                note.last_edit.to_rfc3339_opts(SecondsFormat::Secs, true),
                if note.is_public { "public" } else { "private" },
                url = note.url(),
            );
        }

        debug!(notes = notes.len(), "list_synthesizer: generated ls");
        Ok(synthetic(LS_ID, md))
    }

    /// The `lstag` note: one table row per tag with the notes carrying it.
    pub async fn all_tags(&self) -> StoreResult<Note> {
        let notes = self.load_all().await?;
        let index = TagIndex::from_notes(&notes);

        let mut md = String::from("# All tags\n");
        md.push_str(AUTOGENERATED);
        md.push_str("\n\n|tag|notes|\n|---|---|\n");
        for (tag, ids) in index.iter() {
            let links: Vec<String> = ids.iter().map(|id| format!("[/{id}](/{id})")).collect();
            let _ = writeln!(md, "|{}|{}|", escape_cell(tag), links.join(", "));
        }

        debug!(tags = index.len(), "list_synthesizer: generated lstag");
        Ok(synthetic(LSTAG_ID, md))
    }
}

fn synthetic(id: &str, contents: String) -> Note {
    Note::new(id, contents)
        .with_title(id)
        .with_tags([SYSTEM_TAG])
}

/// Make `text` safe inside a single markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use snote_store::InMemoryStorage;

    async fn seeded() -> ListSynthesizer {
        let store = Arc::new(InMemoryStorage::new());
        store
            .save_note(
                Note::new("groceries", "# Groceries\n- milk")
                    .with_title("Groceries")
                    .with_tags(["home", "todo"]),
            )
            .await
            .unwrap();
        store
            .save_note(
                Note::new("work", "# Work")
                    .with_title("Q3 | plans")
                    .with_tags(["todo"])
                    .public(true),
            )
            .await
            .unwrap();
        ListSynthesizer::new(store)
    }

    #[test]
    fn recognizes_synthetic_ids() {
        assert!(ListSynthesizer::is_synthetic("ls"));
        assert!(ListSynthesizer::is_synthetic("lstag"));
        assert!(!ListSynthesizer::is_synthetic("lst"));
    }

    #[tokio::test]
    async fn ls_has_a_row_per_note() {
        let ls = seeded().await.synthesize("ls").await.unwrap().unwrap();
        assert_eq!(ls.id, "ls");
        assert!(ls.tags.contains(SYSTEM_TAG));
        assert!(ls.contents.contains(AUTOGENERATED));
        assert!(ls.contents.contains("|title|url|ID|size[B]|tags|last edit|visibility|"));

        let rows: Vec<&str> = ls
            .contents
            .lines()
            .filter(|l| l.contains("]("))
            .collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("|Groceries|[/groceries](/groceries)|groceries|18|home, todo|"));
        assert!(rows[0].ends_with("|private|"));
        assert!(rows[1].starts_with("|Q3 \\| plans|[/work](/work)|work|6|todo|"));
        assert!(rows[1].ends_with("|public|"));
    }

    #[tokio::test]
    async fn lstag_lists_notes_per_tag() {
        let lstag = seeded().await.synthesize("lstag").await.unwrap().unwrap();
        assert_eq!(lstag.id, "lstag");
        assert!(lstag.contents.contains("|home|[/groceries](/groceries)|"));
        assert!(lstag
            .contents
            .contains("|todo|[/groceries](/groceries), [/work](/work)|"));
    }

    #[tokio::test]
    async fn regenerated_on_every_call() {
        let store = Arc::new(InMemoryStorage::new());
        let synth = ListSynthesizer::new(store.clone());
        let before = synth.all_notes().await.unwrap();
        store.save_note(Note::new("fresh", "")).await.unwrap();
        let after = synth.all_notes().await.unwrap();
        assert!(!before.contents.contains("/fresh"));
        assert!(after.contents.contains("[/fresh](/fresh)"));
    }

    #[tokio::test]
    async fn other_ids_are_not_synthesized() {
        assert!(seeded().await.synthesize("groceries").await.unwrap().is_none());
    }

    #[test]
    fn cells_are_escaped() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }
}
