pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod models;
pub mod store;

pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use index::{SearchHit, TextIndex};
pub use models::{
    DEFAULT_CATEGORY, Note, NoteBuilder, NoteId, SUGGESTED_CATEGORIES, is_suggested_category,
    split_tags,
};
pub use store::{NoteStore, SearchResult, SyncReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_accessible_from_crate_root() {
        let db = Database::in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn types_accessible_from_crate_root() {
        let note = NoteBuilder::new().id(NoteId::new(1)).title("test").build();
        assert_eq!(note.title, "test");

        let tags: Vec<&str> = split_tags("a, b").collect();
        assert_eq!(tags, vec!["a", "b"]);

        assert!(SyncReport::default().is_consistent());
    }
}
