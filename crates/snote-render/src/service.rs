use std::sync::Arc;

use snote_index::ListSynthesizer;
use snote_store::NoteStore;
use snote_types::Note;
use tracing::{debug, warn};

use crate::cache::{Fingerprint, RenderCache};
use crate::error::RenderResult;
use crate::renderer::Renderer;

/// A note together with its HTML.
#[derive(Clone, Debug)]
pub struct RenderedNote {
    pub note: Note,
    pub html: Arc<str>,
    /// `true` when the HTML came from the cache.
    pub cached: bool,
}

/// Loads, renders and caches notes.
///
/// The store handed in should be the same (hooked) store the write path
/// uses, so every read sees the latest save.
#[derive(Clone)]
pub struct RenderService {
    notes: Arc<dyn NoteStore>,
    cache: Arc<RenderCache>,
    renderer: Arc<dyn Renderer>,
    lists: ListSynthesizer,
}

impl RenderService {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        cache: Arc<RenderCache>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let lists = ListSynthesizer::new(Arc::clone(&notes));
        Self {
            notes,
            cache,
            renderer,
            lists,
        }
    }

    pub fn cache(&self) -> &Arc<RenderCache> {
        &self.cache
    }

    /// Render note `id`, or one of the synthetic listing notes.
    pub async fn render_note(&self, id: &str) -> RenderResult<RenderedNote> {
        if let Some(note) = self.lists.synthesize(id).await? {
            let html: Arc<str> = self.renderer.render(&note.contents).await?.into();
            return Ok(RenderedNote {
                note,
                html,
                cached: false,
            });
        }

        let note = self.notes.load_note(id).await?;
        let fingerprint = Fingerprint::of(&note.contents);
        if let Some(html) = self.cache.get_fresh(id, &fingerprint) {
            debug!(note_id = %id, "render_service: cache hit");
            return Ok(RenderedNote {
                note,
                html,
                cached: true,
            });
        }

        let html: Arc<str> = match self.renderer.render(&note.contents).await {
            Ok(html) => html.into(),
            Err(e) => {
                warn!(note_id = %id, error = %e, "render_service: render failed");
                return Err(e);
            }
        };
        self.cache.put_default(id, fingerprint, Arc::clone(&html));
        debug!(note_id = %id, bytes = html.len(), "render_service: rendered and cached");
        Ok(RenderedNote {
            note,
            html,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::renderer::MarkdownRenderer;
    use async_trait::async_trait;
    use snote_store::{HookedNoteStore, InMemoryStorage, WriteHook};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renders by echoing, counting calls; fails on contents containing "FAIL".
    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for CountingRenderer {
        async fn render(&self, markdown: &str) -> RenderResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if markdown.contains("FAIL") {
                return Err(RenderError::Failed("boom".into()));
            }
            Ok(format!("<p>{markdown}</p>"))
        }
    }

    fn setup() -> (Arc<HookedNoteStore>, Arc<CountingRenderer>, RenderService) {
        let cache = Arc::new(RenderCache::default());
        let store = Arc::new(
            HookedNoteStore::new(Arc::new(InMemoryStorage::new()))
                .with_hook(Arc::clone(&cache) as Arc<dyn WriteHook>),
        );
        let renderer = Arc::new(CountingRenderer::default());
        let service = RenderService::new(store.clone(), cache, renderer.clone());
        (store, renderer, service)
    }

    #[tokio::test]
    async fn second_render_is_cached() {
        let (store, renderer, service) = setup();
        store.save_note(Note::new("a", "hello")).await.unwrap();

        let first = service.render_note("a").await.unwrap();
        let second = service.render_note("a").await.unwrap();
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(&*second.html, "<p>hello</p>");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn save_then_render_never_serves_old_html() {
        let (store, _renderer, service) = setup();
        store.save_note(Note::new("x", "before")).await.unwrap();
        service.render_note("x").await.unwrap();

        store.save_note(Note::new("x", "after")).await.unwrap();
        let rendered = service.render_note("x").await.unwrap();
        assert_eq!(&*rendered.html, "<p>after</p>");
        assert!(!rendered.cached);
    }

    #[tokio::test]
    async fn stale_entry_put_after_invalidation_is_not_served() {
        let (store, _renderer, service) = setup();
        store.save_note(Note::new("x", "new")).await.unwrap();
        // A slow render of older contents finishing after the save.
        service
            .cache()
            .put_default("x", Fingerprint::of("old"), Arc::from("<p>old</p>"));

        let rendered = service.render_note("x").await.unwrap();
        assert_eq!(&*rendered.html, "<p>new</p>");
    }

    #[tokio::test]
    async fn failed_render_is_not_cached() {
        let (store, renderer, service) = setup();
        store.save_note(Note::new("bad", "FAIL")).await.unwrap();
        assert!(service.render_note("bad").await.is_err());
        assert!(service.render_note("bad").await.is_err());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
        assert!(service.cache().get("bad").is_none());
    }

    #[tokio::test]
    async fn missing_note_is_not_found() {
        let (_store, _renderer, service) = setup();
        assert!(service.render_note("ghost").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn listings_are_never_cached() {
        let (store, renderer, service) = setup();
        store.save_note(Note::new("one", "")).await.unwrap();
        service.render_note("ls").await.unwrap();
        store.save_note(Note::new("two", "")).await.unwrap();
        let ls = service.render_note("ls").await.unwrap();
        assert!(!ls.cached);
        assert!(ls.html.contains("/two"));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn renders_real_markdown() {
        let cache = Arc::new(RenderCache::default());
        let store = Arc::new(InMemoryStorage::new());
        store.save_note(Note::new("m", "# Title")).await.unwrap();
        let service = RenderService::new(store, cache, Arc::new(MarkdownRenderer));
        let out = service.render_note("m").await.unwrap();
        assert!(out.html.contains("<h1>Title</h1>"));
    }
}
