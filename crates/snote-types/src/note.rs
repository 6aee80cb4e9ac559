use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A markdown document keyed by a caller-chosen ID.
///
/// `contents` is the single source of truth: the title shown in listings and
/// every blob reference are derived from it. Tags are set explicitly by the
/// caller. Saves replace the whole note; `last_edit` is stamped by the store
/// and whatever the caller puts there is overwritten.
///
/// Serialized as one JSON object per note:
///
/// ```json
/// {"id":"todo","title":"Todo","contents":"# Todo","tags":["home"],
///  "last_edit":"2024-06-01T10:00:00Z","is_public":false}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub last_edit: DateTime<Utc>,
    #[serde(default)]
    pub is_public: bool,
}

impl Note {
    /// Create a private note with no title or tags, stamped now.
    pub fn new(id: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            contents: contents.into(),
            tags: BTreeSet::new(),
            last_edit: Utc::now(),
            is_public: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Size of the raw markdown in bytes.
    pub fn content_size(&self) -> usize {
        self.contents.len()
    }

    /// Path under which the rendered note is served.
    pub fn url(&self) -> String {
        format!("/{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let note = Note::new("todo", "# Todo\n- milk")
            .with_title("Todo")
            .with_tags(["home", "errands", "home"])
            .public(true);
        assert_eq!(note.id, "todo");
        assert_eq!(note.title, "Todo");
        assert_eq!(note.tags.len(), 2);
        assert!(note.is_public);
        assert_eq!(note.url(), "/todo");
        assert_eq!(note.content_size(), "# Todo\n- milk".len());
    }

    #[test]
    fn json_field_names() {
        let note = Note::new("a", "body").with_tags(["t"]);
        let value = serde_json::to_value(&note).unwrap();
        for field in ["id", "title", "contents", "tags", "last_edit", "is_public"] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert!(value["tags"].is_array());
        assert!(value["last_edit"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn json_roundtrip() {
        let note = Note::new("a", "body").with_title("A").with_tags(["x", "y"]);
        let json = serde_json::to_string(&note).unwrap();
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{"id":"n","last_edit":"2024-06-01T10:00:00Z"}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.id, "n");
        assert!(note.contents.is_empty());
        assert!(note.tags.is_empty());
        assert!(!note.is_public);
    }

    #[test]
    fn content_size_counts_bytes() {
        let note = Note::new("u", "é");
        assert_eq!(note.content_size(), 2);
    }
}
