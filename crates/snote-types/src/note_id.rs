//! Note identifier validation.
//!
//! Note IDs double as file and object names, so they are restricted to a
//! portable character set:
//! - Must be non-empty and at most [`MAX_NOTE_ID_LEN`] bytes
//! - Only ASCII letters, digits, `-`, `_` and `.`
//! - Must not start with `.` (hidden files, `..` traversal, temp files)
//!
//! The IDs in [`RESERVED_NOTE_IDS`] are valid but belong to the synthetic
//! listing notes; callers creating user notes must reject them.

use crate::error::TypeError;

/// Maximum length of a note ID in bytes.
pub const MAX_NOTE_ID_LEN: usize = 128;

/// IDs served by the list synthesizer and never persisted.
pub const RESERVED_NOTE_IDS: &[&str] = &["ls", "lstag"];

/// Validate a note ID, returning `Ok(())` if it may be stored.
///
/// # Examples
///
/// ```
/// use snote_types::validate_note_id;
///
/// assert!(validate_note_id("groceries").is_ok());
/// assert!(validate_note_id("2024-06_trip.plan").is_ok());
/// assert!(validate_note_id("").is_err());
/// assert!(validate_note_id("../etc/passwd").is_err());
/// ```
pub fn validate_note_id(id: &str) -> Result<(), TypeError> {
    let invalid = |reason: String| TypeError::InvalidNoteId {
        id: id.to_string(),
        reason,
    };

    if id.is_empty() {
        return Err(invalid("must not be empty".into()));
    }
    if id.len() > MAX_NOTE_ID_LEN {
        return Err(invalid(format!("longer than {MAX_NOTE_ID_LEN} bytes")));
    }
    if let Some(ch) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    if id.starts_with('.') {
        return Err(invalid("must not start with '.'".into()));
    }
    Ok(())
}

/// Returns `true` for IDs owned by the synthetic listing notes.
pub fn is_reserved_note_id(id: &str) -> bool {
    RESERVED_NOTE_IDS.contains(&id)
}
