mod category;
mod ids;
mod note;

pub use category::{DEFAULT_CATEGORY, SUGGESTED_CATEGORIES, is_suggested_category};
pub use ids::NoteId;
pub use note::{Note, NoteBuilder, split_tags};
