use thiserror::Error;

use crate::NoteId;

/// Errors surfaced by the note store and its text index.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or empty.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation targets a note that does not exist.
    #[error("Note with id {0} does not exist")]
    NotFound(NoteId),

    /// The index already holds an entry for this id.
    #[error("Index entry for note {0} already exists")]
    Conflict(NoteId),

    /// The search query could not be parsed by the search engine.
    #[error("Invalid search query: {0}")]
    QuerySyntax(String),

    /// Underlying SQLite failure (I/O, corruption, constraint violations).
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A stored timestamp could not be converted back into a date.
    #[error("Storage error: invalid timestamp: {0}")]
    Timestamp(#[from] time::error::ComponentRange),
}

impl Error {
    /// Returns true for errors caused by caller input rather than the storage layer.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::NotFound(_) | Error::QuerySyntax(_)
        )
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;
