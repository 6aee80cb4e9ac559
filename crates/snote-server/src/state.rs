use std::sync::Arc;

use snote_gc::GcHandle;
use snote_refs::{MarkdownExtractor, ReferenceExtractor};
use snote_render::{MarkdownRenderer, RenderCache, RenderService, Renderer};
use snote_store::{BlobStore, HookedNoteStore, NoteStore, WriteHook};

/// Shared state handed to every request handler.
///
/// `notes` is always wrapped in a [`HookedNoteStore`] that invalidates the
/// render cache, so no handler can write a note around the cache.
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub extractor: Arc<dyn ReferenceExtractor>,
    pub render: RenderService,
    pub gc: Option<GcHandle>,
}

impl AppState {
    /// Wire up state over a note backend and a blob backend with the
    /// markdown extractor and renderer.
    pub fn new(
        notes: Arc<dyn NoteStore>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<RenderCache>,
    ) -> Self {
        Self::with_renderer(notes, blobs, cache, Arc::new(MarkdownRenderer))
    }

    pub fn with_renderer(
        notes: Arc<dyn NoteStore>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<RenderCache>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let notes: Arc<dyn NoteStore> = Arc::new(
            HookedNoteStore::new(notes).with_hook(Arc::clone(&cache) as Arc<dyn WriteHook>),
        );
        let render = RenderService::new(Arc::clone(&notes), cache, renderer);
        Self {
            notes,
            blobs,
            extractor: Arc::new(MarkdownExtractor),
            render,
            gc: None,
        }
    }

    /// Attach a running garbage collection scheduler.
    pub fn with_gc(mut self, gc: GcHandle) -> Self {
        self.gc = Some(gc);
        self
    }
}
