use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::NoteId;

/// A persisted note.
///
/// `id` and `created_at` are fixed when the note is added; every other field
/// may be overwritten by an update. Optional fields are `None` when the note
/// was saved without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Identifier assigned by the store.
    pub id: NoteId,
    /// Required, non-blank title.
    pub title: String,
    /// Markdown source of the note body.
    pub content: Option<String>,
    /// Comma-separated free-form labels, stored exactly as entered.
    pub tags: Option<String>,
    /// Free-form category label.
    pub category: Option<String>,
    /// When this note was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Note {
    /// Returns the note's tags: split on commas, trimmed, empty pieces dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use kb::{NoteBuilder, NoteId};
    ///
    /// let note = NoteBuilder::new()
    ///     .id(NoteId::new(1))
    ///     .title("Groceries")
    ///     .tags(" errands, home,,")
    ///     .build();
    ///
    /// assert_eq!(note.tag_list(), vec!["errands", "home"]);
    /// ```
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags.as_deref().map(|t| split_tags(t).collect()).unwrap_or_default()
    }

    /// Returns true if one of the note's tags equals `tag` exactly (case-sensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_deref()
            .is_some_and(|t| split_tags(t).any(|candidate| candidate == tag))
    }

    /// Returns true if the note's category equals `category` exactly.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.as_deref() == Some(category)
    }
}

/// Splits a raw comma-separated tag string into trimmed, non-empty tags.
pub fn split_tags(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|tag| !tag.is_empty())
}

/// Builder for constructing `Note` instances with optional fields.
///
/// # Examples
///
/// ```
/// use kb::{NoteBuilder, NoteId};
///
/// let note = NoteBuilder::new()
///     .id(NoteId::new(1))
///     .title("Shopping List")
///     .content("buy milk and eggs")
///     .build();
///
/// assert_eq!(note.id, NoteId::new(1));
/// assert_eq!(note.title, "Shopping List");
/// assert!(note.tags.is_none());
/// ```
#[derive(Debug, Default)]
pub struct NoteBuilder {
    id: Option<NoteId>,
    title: Option<String>,
    content: Option<String>,
    tags: Option<String>,
    category: Option<String>,
    created_at: Option<OffsetDateTime>,
}

impl NoteBuilder {
    /// Creates a new `NoteBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the note ID.
    pub fn id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the note title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the note content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the raw comma-separated tags.
    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Sets the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the created timestamp.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Builds the `Note`, using defaults for optional fields.
    ///
    /// # Panics
    ///
    /// Panics if `id` or `title` have not been set.
    pub fn build(self) -> Note {
        Note {
            id: self.id.expect("id is required"),
            title: self.title.expect("title is required"),
            content: self.content,
            tags: self.tags,
            category: self.category,
            created_at: self.created_at.unwrap_or_else(OffsetDateTime::now_utc),
        }
    }
}
