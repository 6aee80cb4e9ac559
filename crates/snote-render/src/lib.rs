//! Rendering of notes to HTML, memoized by a render cache.
//!
//! Rendering a long note is expensive, so [`RenderService`] keeps the HTML in
//! a [`RenderCache`]. The cache is correct as well as fast:
//!
//! 1. Every cached entry records a [`Fingerprint`] of the markdown it was
//!    rendered from. A hit is only served when it matches the note as
//!    currently stored.
//! 2. The cache is a [`WriteHook`](snote_store::WriteHook): saving or
//!    deleting a note through a [`HookedNoteStore`](snote_store::HookedNoteStore)
//!    drops its entry immediately.
//! 3. Failed renders are returned to the caller and never cached.
//! 4. The synthetic `ls` and `lstag` notes are rendered fresh every time.

pub mod cache;
pub mod error;
pub mod renderer;
pub mod service;

pub use cache::{Fingerprint, RenderCache, DEFAULT_RENDER_TTL};
pub use error::{RenderError, RenderResult};
pub use renderer::{MarkdownRenderer, Renderer};
pub use service::{RenderService, RenderedNote};
