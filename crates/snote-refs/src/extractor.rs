use std::collections::BTreeSet;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use snote_types::BlobId;
use tracing::trace;

use crate::error::ExtractResult;
use crate::url::parse_blob_url;

/// Everything derived from one note's contents in a single walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Blobs embedded by image or link targets.
    pub blob_ids: BTreeSet<BlobId>,
    /// Text of the first heading in document order, empty if there is none.
    pub title: String,
}

/// Derives blob references and a title from raw note contents.
///
/// Implementations must fail rather than return an empty set when the
/// contents cannot be interpreted.
pub trait ReferenceExtractor: Send + Sync {
    fn extract(&self, contents: &str) -> ExtractResult<Extraction>;

    /// Only the referenced blob IDs.
    fn blob_ids(&self, contents: &str) -> ExtractResult<BTreeSet<BlobId>> {
        Ok(self.extract(contents)?.blob_ids)
    }

    /// Only the title.
    fn title(&self, contents: &str) -> ExtractResult<String> {
        Ok(self.extract(contents)?.title)
    }
}

/// [`ReferenceExtractor`] over a CommonMark tree (pulldown-cmark).
///
/// Parses with the same extensions the renderer enables, so a link the
/// renderer turns into an `<a>` or `<img>` is exactly a link seen here.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownExtractor;

impl MarkdownExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parser options shared with HTML rendering.
    pub fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
    }
}

impl ReferenceExtractor for MarkdownExtractor {
    fn extract(&self, contents: &str) -> ExtractResult<Extraction> {
        let mut out = Extraction::default();
        let mut in_first_heading = false;
        let mut seen_heading = false;

        for event in Parser::new_ext(contents, Self::options()) {
            match event {
                Event::Start(Tag::Image { dest_url, .. } | Tag::Link { dest_url, .. }) => {
                    if let Some(id) = parse_blob_url(&dest_url)? {
                        out.blob_ids.insert(id);
                    }
                }
                Event::Start(Tag::Heading { .. }) if !seen_heading => {
                    seen_heading = true;
                    in_first_heading = true;
                }
                Event::End(TagEnd::Heading(_)) if in_first_heading => {
                    in_first_heading = false;
                }
                Event::Text(text) | Event::Code(text) if in_first_heading => {
                    out.title.push_str(&text);
                }
                Event::SoftBreak | Event::HardBreak if in_first_heading => {
                    out.title.push(' ');
                }
                _ => {}
            }
        }

        out.title = out.title.trim().to_string();
        trace!(
            blobs = out.blob_ids.len(),
            title = %out.title,
            "markdown_extractor: extracted"
        );
        Ok(out)
    }
}
