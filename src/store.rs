use std::collections::BTreeSet;

use rusqlite::{OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::{Database, Error, Note, NoteBuilder, NoteId, Result, TextIndex, split_tags};

const NOTE_COLUMNS: &str = "id, title, content, tags, category, created_at";

/// Authoritative note storage with a synchronized full-text index.
///
/// NoteStore owns a Database instance. Every write runs the record change and
/// the matching index change in one SQLite transaction, so the set of ids in
/// `notes` and in the index never diverge. It is UI-independent: front ends
/// call these operations and render whatever comes back.
///
/// # Examples
///
/// ```
/// use kb::{Database, NoteStore};
///
/// # fn main() -> kb::Result<()> {
/// let db = Database::in_memory()?;
/// let mut store = NoteStore::new(db);
///
/// let id = store.add("Shopping List", Some("buy milk and eggs"), Some("errands,home"), Some("Personal"))?;
/// let found = store.search("milk")?;
/// assert_eq!(found[0].id, id);
/// # Ok(())
/// # }
/// ```
pub struct NoteStore {
    db: Database,
}

impl NoteStore {
    /// Creates a new NoteStore with the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    ///
    /// Useful for testing or advanced operations that need direct database access.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates a note and indexes it. Returns the new id.
    ///
    /// The title must contain something other than whitespace. `created_at`
    /// is set to the current time. If indexing fails, the record insert is
    /// rolled back.
    pub fn add(
        &mut self,
        title: &str,
        content: Option<&str>,
        tags: Option<&str>,
        category: Option<&str>,
    ) -> Result<NoteId> {
        validate_title(title)?;

        let created_at = OffsetDateTime::now_utc();
        let tx = self.db.connection_mut().transaction()?;

        tx.execute(
            "INSERT INTO notes (title, content, tags, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![title, content, tags, category, to_stored_timestamp(created_at)],
        )?;
        let id = NoteId::new(tx.last_insert_rowid());

        TextIndex::new(&tx).insert(id, title, content)?;
        tx.commit()?;

        debug!(%id, "added note");
        Ok(id)
    }

    /// Overwrites every mutable field of an existing note and reindexes it.
    ///
    /// `id` and `created_at` are left untouched. Fails with
    /// [`Error::NotFound`] before any validation if the note does not exist.
    pub fn update(
        &mut self,
        id: NoteId,
        title: &str,
        content: Option<&str>,
        tags: Option<&str>,
        category: Option<&str>,
    ) -> Result<()> {
        let tx = self.db.connection_mut().transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1)",
            [id.get()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::NotFound(id));
        }

        validate_title(title)?;

        tx.execute(
            "UPDATE notes SET title = ?1, content = ?2, tags = ?3, category = ?4 WHERE id = ?5",
            rusqlite::params![title, content, tags, category, id.get()],
        )?;
        TextIndex::new(&tx).replace(id, title, content)?;
        tx.commit()?;

        debug!(%id, "updated note");
        Ok(())
    }

    /// Deletes a note and its index entry.
    ///
    /// Fails with [`Error::NotFound`] if the note does not exist.
    pub fn delete(&mut self, id: NoteId) -> Result<()> {
        let tx = self.db.connection_mut().transaction()?;

        let deleted = tx.execute("DELETE FROM notes WHERE id = ?1", [id.get()])?;
        if deleted == 0 {
            return Err(Error::NotFound(id));
        }

        TextIndex::new(&tx).remove(id)?;
        tx.commit()?;

        debug!(%id, "deleted note");
        Ok(())
    }

    /// Retrieves a note by its ID.
    ///
    /// Returns `None` if no note exists with the given ID. The index is not consulted.
    pub fn get(&self, id: NoteId) -> Result<Option<Note>> {
        let row = self
            .db
            .connection()
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                [id.get()],
                NoteRow::from_row,
            )
            .optional()?;

        row.map(NoteRow::into_note).transpose()
    }

    /// Lists every note, newest first; equal timestamps order by id descending.
    pub fn list_all(&self) -> Result<Vec<Note>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], NoteRow::from_row)?;

        let mut notes = Vec::new();
        for row_result in rows {
            notes.push(row_result?.into_note()?);
        }

        Ok(notes)
    }

    /// Full-text search returning notes in rank order.
    ///
    /// See [`TextIndex::search`] for query syntax and ordering.
    pub fn search(&self, query: &str) -> Result<Vec<Note>> {
        let results = self.search_ranked(query, None)?;
        Ok(results.into_iter().map(|result| result.note).collect())
    }

    /// Full-text search returning notes with their relevance scores.
    ///
    /// Ids the index returns for notes that no longer exist are skipped.
    /// `limit` caps the number of results after stale ids are dropped.
    pub fn search_ranked(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        let hits = TextIndex::new(self.db.connection()).search(query)?;
        let limit = limit.unwrap_or(usize::MAX);

        let mut results = Vec::new();
        for hit in hits {
            if results.len() >= limit {
                break;
            }
            match self.get(hit.id)? {
                Some(note) => results.push(SearchResult {
                    note,
                    score: hit.score,
                }),
                None => warn!(id = %hit.id, "search skipped index entry without a note"),
            }
        }

        Ok(results)
    }

    /// Notes carrying `tag` exactly (case-sensitive, after trimming), in `list_all` order.
    pub fn filter_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        let mut notes = self.list_all()?;
        notes.retain(|note| note.has_tag(tag));
        Ok(notes)
    }

    /// Notes whose category equals `category` exactly, in `list_all` order.
    pub fn list_by_category(&self, category: &str) -> Result<Vec<Note>> {
        let mut notes = self.list_all()?;
        notes.retain(|note| note.in_category(category));
        Ok(notes)
    }

    /// Every distinct tag across all notes, sorted alphabetically.
    pub fn list_tags(&self) -> Result<Vec<String>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare("SELECT tags FROM notes WHERE tags IS NOT NULL")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tags = BTreeSet::new();
        for row_result in rows {
            let raw = row_result?;
            tags.extend(split_tags(&raw).map(String::from));
        }

        Ok(tags.into_iter().collect())
    }

    /// Number of stored notes.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .connection()
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Compares the ids in the record table with the ids in the index.
    pub fn check_sync(&self) -> Result<SyncReport> {
        let conn = self.db.connection();

        let mut stmt = conn.prepare("SELECT id FROM notes")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut note_ids = BTreeSet::new();
        for row_result in rows {
            note_ids.insert(NoteId::new(row_result?));
        }

        let index_ids: BTreeSet<NoteId> = TextIndex::new(conn).indexed_ids()?.into_iter().collect();

        let report = SyncReport {
            missing_from_index: note_ids.difference(&index_ids).copied().collect(),
            orphaned_in_index: index_ids.difference(&note_ids).copied().collect(),
        };

        if !report.is_consistent() {
            warn!(
                missing = report.missing_from_index.len(),
                orphaned = report.orphaned_in_index.len(),
                "note index out of sync"
            );
        }

        Ok(report)
    }

    /// Discards the whole index and rebuilds it from the record table.
    ///
    /// Runs in one transaction. Returns the number of entries written.
    pub fn rebuild_index(&mut self) -> Result<usize> {
        let tx = self.db.connection_mut().transaction()?;

        let entries: Vec<(i64, String, Option<String>)> = {
            let mut stmt = tx.prepare("SELECT id, title, content FROM notes ORDER BY id")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let index = TextIndex::new(&tx);
        let cleared = index.clear()?;
        for (id, title, content) in &entries {
            index.insert(NoteId::new(*id), title, content.as_deref())?;
        }
        tx.commit()?;

        info!(cleared, indexed = entries.len(), "rebuilt note index");
        Ok(entries.len())
    }
}

/// A search match with its note hydrated from the record table.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The matching note.
    pub note: Note,
    /// Relevance score from the index. Higher is more relevant.
    pub score: f64,
}

/// Differences between the record table and the text index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Notes with no index entry.
    pub missing_from_index: Vec<NoteId>,
    /// Index entries with no note.
    pub orphaned_in_index: Vec<NoteId>,
}

impl SyncReport {
    /// Returns true if the record table and index hold the same ids.
    pub fn is_consistent(&self) -> bool {
        self.missing_from_index.is_empty() && self.orphaned_in_index.is_empty()
    }
}

/// Raw column values of one `notes` row.
struct NoteRow {
    id: i64,
    title: String,
    content: Option<String>,
    tags: Option<String>,
    category: Option<String>,
    created_at: i64,
}

impl NoteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            tags: row.get(3)?,
            category: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_note(self) -> Result<Note> {
        let mut builder = NoteBuilder::new()
            .id(NoteId::new(self.id))
            .title(self.title)
            .created_at(from_stored_timestamp(self.created_at)?);

        if let Some(content) = self.content {
            builder = builder.content(content);
        }
        if let Some(tags) = self.tags {
            builder = builder.tags(tags);
        }
        if let Some(category) = self.category {
            builder = builder.category(category);
        }

        Ok(builder.build())
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("Note title cannot be empty".to_string()));
    }
    Ok(())
}

/// Timestamps are stored as unix nanoseconds (UTC).
fn to_stored_timestamp(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos()).unwrap_or(i64::MAX)
}

fn from_stored_timestamp(nanos: i64) -> Result<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))?)
}
