use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Label shown wherever a note has no title of its own.
pub const PLACEHOLDER_TITLE: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single note. Only the note store creates or mutates these; everything
/// else sees them through shared references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    id: NoteId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(with = "time::serde::rfc3339")]
    created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated: OffsetDateTime,
}

impl Note {
    pub(super) fn new(now: OffsetDateTime) -> Self {
        Self {
            id: NoteId::generate(),
            title: PLACEHOLDER_TITLE.to_string(),
            content: String::new(),
            created: now,
            updated: now,
        }
    }

    pub fn id(&self) -> &NoteId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The title, or the placeholder when the title is blank.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            PLACEHOLDER_TITLE
        } else {
            &self.title
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn first_line(&self) -> &str {
        self.content.lines().next().unwrap_or_default()
    }

    pub fn created(&self) -> OffsetDateTime {
        self.created
    }

    pub fn updated(&self) -> OffsetDateTime {
        self.updated
    }

    pub(super) fn apply(&mut self, patch: NotePatch, now: OffsetDateTime) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        self.touch(now);
    }

    pub(super) fn touch(&mut self, now: OffsetDateTime) {
        self.updated = now.max(self.created);
    }
}

/// Field changes for `NoteStore::update`. Only title and content are mutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn new_note_has_matching_timestamps_and_placeholder() {
        let now = datetime!(2024-05-01 09:30 UTC);
        let note = Note::new(now);
        assert_eq!(note.created(), now);
        assert_eq!(note.updated(), now);
        assert_eq!(note.title(), PLACEHOLDER_TITLE);
        assert!(note.content().is_empty());
    }

    #[test]
    fn blank_title_displays_placeholder() {
        let mut note = Note::new(datetime!(2024-05-01 09:30 UTC));
        note.apply(NotePatch::title("   "), datetime!(2024-05-01 09:31 UTC));
        assert_eq!(note.title(), "   ");
        assert_eq!(note.display_title(), PLACEHOLDER_TITLE);
    }

    #[test]
    fn touch_never_moves_updated_before_created() {
        let created = datetime!(2024-05-01 09:30 UTC);
        let mut note = Note::new(created);
        note.touch(datetime!(2023-01-01 00:00 UTC));
        assert_eq!(note.updated(), created);
    }

    #[test]
    fn parses_millisecond_zulu_timestamps() -> anyhow::Result<()> {
        let raw = r#"{"id":"1715000000000","title":"Groceries","content":"eggs\nmilk",
            "created":"2024-05-06T12:53:20.000Z","updated":"2024-05-06T12:54:00.123Z"}"#;
        let note: Note = serde_json::from_str(raw)?;
        assert_eq!(note.id().as_str(), "1715000000000");
        assert_eq!(note.first_line(), "eggs");
        assert!(note.created() < note.updated());
        Ok(())
    }
}
