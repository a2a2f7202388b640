/// Version stamped into `PRAGMA user_version` after the schema is applied.
pub const SCHEMA_VERSION: i32 = 1;

/// Record table for notes.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// AUTOINCREMENT keeps SQLite from handing out the id of a deleted note again.
pub const INITIAL_SCHEMA: &str = r#"
-- Notes table: authoritative note records
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT,
    tags TEXT,
    category TEXT,
    created_at INTEGER NOT NULL
);

-- Index for listing notes newest first
CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created_at);
"#;

/// Full-text index over note titles and bodies.
///
/// The FTS rowid is the note id. Porter stemming runs on top of the
/// unicode61 tokenizer, which case-folds and splits on punctuation.
/// FTS5 does not accept IF NOT EXISTS, so callers check `sqlite_master` first.
pub const FTS_TABLE_CREATION: &str = r#"
CREATE VIRTUAL TABLE notes_fts USING fts5(
    title,
    content,
    tokenize = 'porter unicode61'
);
"#;
