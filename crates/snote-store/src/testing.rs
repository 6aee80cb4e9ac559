//! Strategies and model checks shared by the backend test suites.

use std::collections::BTreeSet;

use proptest::prelude::*;
use snote_types::Note;

use crate::traits::NoteStore;

/// Arbitrary storable notes: valid IDs, free-form text, a few tags.
pub fn arb_note() -> impl Strategy<Value = Note> {
    (
        "[a-zA-Z0-9][a-zA-Z0-9._-]{0,15}",
        ".{0,40}",
        "(.|\n){0,200}",
        proptest::collection::btree_set("[a-z][a-z/-]{0,8}", 0..4),
        any::<bool>(),
    )
        .prop_map(|(id, title, contents, tags, is_public)| {
            Note::new(id, contents)
                .with_title(title)
                .with_tags(tags)
                .public(is_public)
        })
}

#[derive(Clone, Debug)]
pub enum NoteOp {
    Save(String),
    Delete(String),
}

/// Saves and deletes over a small ID space, so both hit existing notes.
pub fn arb_note_ops() -> impl Strategy<Value = Vec<NoteOp>> {
    proptest::collection::vec(
        prop_oneof![
            "n[0-5]".prop_map(NoteOp::Save),
            "n[0-5]".prop_map(NoteOp::Delete),
        ],
        0..40,
    )
}

pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Save `note` and load it back, with `last_edit` reset to the input's.
pub async fn save_then_load(store: &dyn NoteStore, note: &Note) -> Note {
    store.save_note(note.clone()).await.unwrap();
    let loaded = store.load_note(&note.id).await.unwrap();
    Note {
        last_edit: note.last_edit,
        ..loaded
    }
}

/// Apply `ops`, checking `list_note_ids` against a set model after each.
pub async fn listing_follows_model(store: &dyn NoteStore, ops: &[NoteOp]) -> Result<(), String> {
    let mut model = BTreeSet::new();
    for op in ops {
        match op {
            NoteOp::Save(id) => {
                store.save_note(Note::new(id.as_str(), "")).await.unwrap();
                model.insert(id.clone());
            }
            NoteOp::Delete(id) => {
                let deleted = store.delete_note(id).await;
                if model.remove(id) {
                    deleted.unwrap();
                } else {
                    assert!(deleted.unwrap_err().is_not_found());
                }
            }
        }
        let listed = store.list_note_ids().await.unwrap();
        if listed != model {
            return Err(format!("after {op:?}: listed {listed:?}, expected {model:?}"));
        }
    }
    Ok(())
}
