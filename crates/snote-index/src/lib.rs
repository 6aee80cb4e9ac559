//! Derived views over the note store.
//!
//! Nothing here is persisted. Both types are rebuilt from a
//! [`NoteStore`](snote_store::NoteStore) whenever they are needed.
//!
//! # Key Types
//!
//! - [`TagIndex`] -- tag to note-ID mapping
//! - [`ListSynthesizer`] -- the read-only `ls` and `lstag` notes

pub mod list;
pub mod tags;

pub use list::{ListSynthesizer, SYSTEM_TAG};
pub use tags::TagIndex;
