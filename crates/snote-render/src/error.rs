use snote_store::StoreError;
use thiserror::Error;

/// Errors from rendering a note.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Loading the note (or the notes a listing summarizes) failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The markdown-to-HTML transform failed.
    #[error("render failed: {0}")]
    Failed(String),
}

impl RenderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

/// Result alias for rendering.
pub type RenderResult<T> = Result<T, RenderError>;
