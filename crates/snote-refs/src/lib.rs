//! Reference extraction for snote notes.
//!
//! A note embeds an uploaded blob by linking to it under the blob-retrieval
//! URL convention, `/api/blob/<blob-id>/<filename>`. This crate walks a
//! note's markdown tree and recovers:
//!
//! - the set of [`BlobId`](snote_types::BlobId)s the note references, which
//!   drives garbage collection
//! - the note's display title (text of the first heading)
//!
//! # Modules
//!
//! - [`error`] -- [`ExtractError`]
//! - [`url`] -- Building and parsing blob URLs
//! - [`extractor`] -- The [`ReferenceExtractor`] trait and [`MarkdownExtractor`]

pub mod error;
pub mod extractor;
pub mod url;

pub use error::{ExtractError, ExtractResult};
pub use extractor::{Extraction, MarkdownExtractor, ReferenceExtractor};
pub use url::{blob_url, parse_blob_url, BLOB_URL_PREFIX};
