//! Garbage collection of unreferenced blobs.
//!
//! One pass walks `CollectNoteIds -> ExtractReferences -> CollectBlobIds ->
//! Diff -> Delete` and removes every stored blob no note links to.
//!
//! # Safety Rules
//!
//! 1. Any load or extraction failure while scanning aborts the pass before
//!    anything is deleted.
//! 2. If at least one note exists but the union of references is empty, the
//!    pass aborts without deleting. An empty reference set is far more
//!    likely to be an extraction bug than a store without attachments.
//! 3. The first failed deletion aborts the rest of the pass.
//! 4. At most one pass runs at a time; triggers that arrive during a pass are
//!    dropped, not queued.

pub mod collector;
pub mod error;
pub mod scheduler;

pub use collector::{GarbageCollector, GcPlan, GcReport};
pub use error::{GcError, GcPhase, GcResult};
pub use scheduler::{GcHandle, GcScheduler, TriggerOutcome};
