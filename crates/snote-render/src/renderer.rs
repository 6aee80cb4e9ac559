use async_trait::async_trait;
use pulldown_cmark::{html, Parser};
use snote_refs::MarkdownExtractor;
use tracing::trace;

use crate::error::{RenderError, RenderResult};

/// Markdown-to-HTML transform.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, markdown: &str) -> RenderResult<String>;
}

/// CommonMark renderer (pulldown-cmark) with tables, strikethrough, task
/// lists and footnotes.
///
/// Runs on the blocking pool: a long note takes long enough to render that it
/// would otherwise stall a runtime worker.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render synchronously on the current thread.
    pub fn render_blocking(markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, MarkdownExtractor::options());
        let mut out = String::with_capacity(markdown.len() + markdown.len() / 2);
        html::push_html(&mut out, parser);
        out
    }
}

#[async_trait]
impl Renderer for MarkdownRenderer {
    async fn render(&self, markdown: &str) -> RenderResult<String> {
        let markdown = markdown.to_owned();
        let len = markdown.len();
        let html = tokio::task::spawn_blocking(move || Self::render_blocking(&markdown))
            .await
            .map_err(|e| RenderError::Failed(e.to_string()))?;
        trace!(markdown_bytes = len, html_bytes = html.len(), "markdown_renderer: rendered");
        Ok(html)
    }
}
