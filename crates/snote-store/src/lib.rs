//! Note and blob storage for snote.
//!
//! Notes are JSON documents keyed by a caller-chosen ID. Blobs are immutable
//! attachments keyed by the digest of their bytes (see
//! [`snote_types::BlobId`]), analogous to a git object directory.
//!
//! # Storage Backends
//!
//! Every backend implements both [`NoteStore`] and [`BlobStore`]:
//!
//! - [`DiskStorage`] -- `<root>/<id>.json` notes, `<root>/blobs/<hex>` blobs
//! - [`InMemoryStorage`] -- `HashMap`-based store for tests and embedding
//! - [`BucketStorage`] -- object-storage layout over a [`Bucket`] client
//!
//! # Design Rules
//!
//! 1. Note saves are atomic replaces: write a temporary file, then rename.
//!    Concurrent saves to one ID resolve as last writer wins.
//! 2. Blobs are never updated in place. A put only writes when the ID is
//!    absent, so identical concurrent uploads converge on one object.
//! 3. Blob reads stream; callers never need the whole object in memory.
//! 4. Errors are typed and propagated, never recovered here.
//! 5. [`HookedNoteStore`] runs [`WriteHook`]s after every successful write.

pub mod bucket;
pub mod disk;
pub mod error;
pub mod hook;
pub mod memory;
pub mod traits;

#[cfg(test)]
mod testing;

pub use bucket::{Bucket, BucketStorage, InMemoryBucket};
pub use disk::DiskStorage;
pub use error::{StoreError, StoreResult};
pub use hook::{HookedNoteStore, WriteHook};
pub use memory::InMemoryStorage;
pub use traits::{BlobReader, BlobStore, NoteStore};
