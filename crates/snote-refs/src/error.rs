use thiserror::Error;

/// Errors raised while deriving references or a title from note contents.
///
/// An extraction failure is never reported as an empty reference set: the
/// garbage collector reads "no references" as "nothing to keep".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// A link or image targets the blob URL prefix but its identifier
    /// segment is not a blob ID.
    #[error("malformed blob reference {url:?}: {reason}")]
    MalformedBlobReference { url: String, reason: String },
}

/// Result alias for extraction.
pub type ExtractResult<T> = Result<T, ExtractError>;
