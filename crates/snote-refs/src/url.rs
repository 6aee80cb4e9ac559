//! The blob-retrieval URL convention.
//!
//! ```text
//! /api/blob/<blob-id>/<filename>
//! ```
//!
//! Only the identifier segment carries identity. The filename is cosmetic and
//! only suggests a download name.

use snote_types::BlobId;

use crate::error::{ExtractError, ExtractResult};

/// Path prefix under which blobs are served.
pub const BLOB_URL_PREFIX: &str = "/api/blob/";

/// Filename used when an upload carries none.
const FALLBACK_FILENAME: &str = "blob";

/// Build the retrieval URL for `id`, suggesting `filename` for downloads.
///
/// Characters that would break the path segment or a markdown link target
/// are replaced with `_`.
///
/// ```
/// use snote_refs::blob_url;
/// use snote_types::BlobId;
///
/// let id = BlobId::parse("abc123").unwrap();
/// assert_eq!(blob_url(&id, "my photo.png"), "/api/blob/abc123/my_photo.png");
/// ```
pub fn blob_url(id: &BlobId, filename: &str) -> String {
    format!("{BLOB_URL_PREFIX}{id}/{}", sanitize_filename(filename))
}

fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// Recognize a link target as a blob reference.
///
/// Returns `Ok(None)` when `target` (after trimming whitespace) does not start
/// with [`BLOB_URL_PREFIX`], `Ok(Some(id))` for a well-formed reference, and
/// an error when the prefix matches but the identifier segment is unusable.
pub fn parse_blob_url(target: &str) -> ExtractResult<Option<BlobId>> {
    let trimmed = target.trim();
    let Some(rest) = trimmed.strip_prefix(BLOB_URL_PREFIX) else {
        return Ok(None);
    };
    let segment = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if segment.is_empty() {
        return Err(ExtractError::MalformedBlobReference {
            url: trimmed.to_string(),
            reason: "missing blob id segment".into(),
        });
    }
    BlobId::parse(segment)
        .map(Some)
        .map_err(|e| ExtractError::MalformedBlobReference {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })
}
