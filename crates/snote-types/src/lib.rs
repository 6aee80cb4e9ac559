//! Foundation types for snote.
//!
//! Every other snote crate depends on `snote-types`.
//!
//! # Key Types
//!
//! - [`Note`] -- A markdown document keyed by a caller-chosen identifier
//! - [`BlobId`] -- Content-addressed identifier of an uploaded attachment (BLAKE3, hex)
//! - [`BlobHasher`] -- Incremental digest for streamed uploads
//! - [`validate_note_id`] -- Rules a note identifier must satisfy to be stored

pub mod blob_id;
pub mod error;
pub mod note;
pub mod note_id;

pub use blob_id::{BlobHasher, BlobId};
pub use error::TypeError;
pub use note::Note;
pub use note_id::{is_reserved_note_id, validate_note_id, RESERVED_NOTE_IDS};
