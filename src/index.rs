//! Full-text index over note titles and bodies.
//!
//! Backed by the `notes_fts` FTS5 table. The index never opens its own
//! transaction: it works on whatever connection it is handed, so the note
//! store can pass an open `rusqlite::Transaction` and keep record and index
//! writes in one unit.

mod query;

use rusqlite::{Connection, ErrorCode};
use tracing::debug;

use crate::{Error, NoteId, Result};

use query::prepare_match_query;

/// One ranked match returned by [`TextIndex::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Id of the matching note.
    pub id: NoteId,
    /// Relevance score (negated BM25). Higher is more relevant.
    pub score: f64,
}

/// Token-based retrieval over note title and content.
pub struct TextIndex<'c> {
    conn: &'c Connection,
}

impl<'c> TextIndex<'c> {
    /// Wraps a connection (or an open transaction) holding the `notes_fts` table.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Adds an entry for an id that is not indexed yet.
    ///
    /// Fails with [`Error::Conflict`] if the id already has an entry; use
    /// [`TextIndex::replace`] to overwrite.
    pub fn insert(&self, id: NoteId, title: &str, content: Option<&str>) -> Result<()> {
        if self.contains(id)? {
            return Err(Error::Conflict(id));
        }

        self.write_entry(id, title, content)?;
        debug!(%id, "indexed note");
        Ok(())
    }

    /// Creates or recreates the entry for `id`, discarding any prior tokens.
    pub fn replace(&self, id: NoteId, title: &str, content: Option<&str>) -> Result<()> {
        self.conn
            .execute("DELETE FROM notes_fts WHERE rowid = ?1", [id.get()])?;
        self.write_entry(id, title, content)?;
        debug!(%id, "reindexed note");
        Ok(())
    }

    /// Deletes the entry for `id`. Absent ids are ignored.
    pub fn remove(&self, id: NoteId) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM notes_fts WHERE rowid = ?1", [id.get()])?;
        debug!(%id, removed, "removed note from index");
        Ok(())
    }

    /// Returns true if `id` has an index entry.
    pub fn contains(&self, id: NoteId) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes_fts WHERE rowid = ?1)",
            [id.get()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Number of indexed entries.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes_fts", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All indexed ids in ascending order.
    pub fn indexed_ids(&self) -> Result<Vec<NoteId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rowid FROM notes_fts ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for row_result in rows {
            ids.push(NoteId::new(row_result?));
        }

        Ok(ids)
    }

    /// Drops every entry. Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM notes_fts", [])?;
        Ok(removed)
    }

    /// Runs a ranked query.
    ///
    /// Terms are stemmed, case-folded and split on punctuation exactly as at
    /// index time, and every term must match (FTS5 implicit AND). Quoted
    /// phrases, `OR`, `NOT`, `NEAR`, prefix `*` and `column:` filters keep
    /// their FTS5 meaning. Hits are ordered by score descending, then id
    /// descending.
    ///
    /// A blank query or one with no matches yields an empty vector. A query
    /// the engine cannot parse fails with [`Error::QuerySyntax`].
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let Some(match_expr) = prepare_match_query(query) else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(
            "SELECT rowid, -bm25(notes_fts) AS score
             FROM notes_fts
             WHERE notes_fts MATCH ?1
             ORDER BY score DESC, rowid DESC",
        )?;

        let rows = stmt
            .query_map([&match_expr], |row| {
                Ok(SearchHit {
                    id: NoteId::new(row.get(0)?),
                    score: row.get(1)?,
                })
            })
            .map_err(match_error)?;

        let mut hits = Vec::new();
        for row_result in rows {
            hits.push(row_result.map_err(match_error)?);
        }

        debug!(query = %match_expr, hits = hits.len(), "searched index");
        Ok(hits)
    }

    fn write_entry(&self, id: NoteId, title: &str, content: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notes_fts (rowid, title, content) VALUES (?1, ?2, ?3)",
            rusqlite::params![id.get(), title, content],
        )?;
        Ok(())
    }
}

/// Maps an error raised while evaluating `MATCH`.
///
/// The statement has already been prepared, so a generic SQLITE_ERROR here
/// comes from the FTS5 expression parser. I/O and corruption errors carry
/// their own codes and stay storage errors.
fn match_error(err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ffi_err, msg) if ffi_err.code == ErrorCode::Unknown => {
            Error::QuerySyntax(msg.unwrap_or_else(|| ffi_err.to_string()))
        }
        other => Error::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn ids(hits: &[SearchHit]) -> Vec<i64> {
        hits.iter().map(|hit| hit.id.get()).collect()
    }

    #[test]
    fn insert_then_search_finds_entry() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index
            .insert(NoteId::new(1), "Shopping List", Some("buy milk and eggs"))
            .unwrap();

        let hits = index.search("milk").unwrap();
        assert_eq!(ids(&hits), vec![1]);
        assert!(hits[0].score > 0.0, "score should be positive: {}", hits[0].score);
    }

    #[test]
    fn insert_rejects_existing_id() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "First", None).unwrap();
        let err = index.insert(NoteId::new(1), "Second", None).unwrap_err();

        assert!(matches!(err, Error::Conflict(id) if id == NoteId::new(1)));
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn replace_discards_old_tokens() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "Draft", Some("apples")).unwrap();
        index.replace(NoteId::new(1), "Draft", Some("oranges")).unwrap();

        assert!(index.search("apples").unwrap().is_empty());
        assert_eq!(ids(&index.search("oranges").unwrap()), vec![1]);
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn replace_on_missing_id_behaves_as_insert() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.replace(NoteId::new(9), "Fresh", Some("content")).unwrap();

        assert!(index.contains(NoteId::new(9)).unwrap());
    }

    #[test]
    fn remove_is_noop_for_missing_id() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.remove(NoteId::new(5)).unwrap();
        index.insert(NoteId::new(5), "Gone soon", None).unwrap();
        index.remove(NoteId::new(5)).unwrap();

        assert!(!index.contains(NoteId::new(5)).unwrap());
        assert!(index.is_empty().unwrap());
    }

    #[test]
    fn search_applies_stemming() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "Morning", Some("running fast")).unwrap();

        assert_eq!(ids(&index.search("run").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("runs").unwrap()), vec![1]);
    }

    #[test]
    fn search_is_case_and_punctuation_insensitive() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index
            .insert(NoteId::new(1), "Shopping List", Some("buy milk, eggs, and bread"))
            .unwrap();

        assert_eq!(ids(&index.search("MILK").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("milk, bread!").unwrap()), vec![1]);
    }

    #[test]
    fn search_requires_all_terms() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "Rust", Some("systems programming")).unwrap();
        index.insert(NoteId::new(2), "Python", Some("scripting and programming")).unwrap();

        assert_eq!(ids(&index.search("rust programming").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("programming").unwrap()).len(), 2);
    }

    #[test]
    fn search_matches_title_terms() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "Quarterly budget", None).unwrap();

        assert_eq!(ids(&index.search("budget").unwrap()), vec![1]);
    }

    #[test]
    fn search_orders_by_relevance() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index
            .insert(
                NoteId::new(1),
                "Cooking",
                Some("a long note about many things where rust appears once among other words"),
            )
            .unwrap();
        index.insert(NoteId::new(2), "Rust", Some("rust rust rust")).unwrap();

        assert_eq!(ids(&index.search("rust").unwrap()), vec![2, 1]);
    }

    #[test]
    fn equal_scores_tie_break_by_descending_id() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "same", Some("text")).unwrap();
        index.insert(NoteId::new(2), "same", Some("text")).unwrap();
        index.insert(NoteId::new(3), "same", Some("text")).unwrap();

        assert_eq!(ids(&index.search("same").unwrap()), vec![3, 2, 1]);
    }

    #[test]
    fn search_without_match_returns_empty() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "Note", Some("content")).unwrap();

        assert!(index.search("zzznomatch").unwrap().is_empty());
        assert!(index.search("   ").unwrap().is_empty());
    }

    #[test]
    fn phrase_and_boolean_syntax_pass_through() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "A", Some("milk and eggs")).unwrap();
        index.insert(NoteId::new(2), "B", Some("eggs and milk")).unwrap();

        assert_eq!(ids(&index.search("\"milk and eggs\"").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("milk NOT \"eggs and milk\"").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("title:b").unwrap()), vec![2]);
    }

    #[test]
    fn everyday_colons_are_plain_separators() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index
            .insert(NoteId::new(1), "Re: budget", Some("meeting at 10:30 about the budget"))
            .unwrap();
        index.insert(NoteId::new(2), "Groceries", Some("bread")).unwrap();

        assert_eq!(ids(&index.search("Re: budget").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("meeting 10:30").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("budget :)").unwrap()), vec![1]);
    }

    #[test]
    fn parentheses_without_operators_are_plain_separators() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "Dairy", Some("milk 2 litres per day")).unwrap();
        index.insert(NoteId::new(2), "Other", Some("milk only")).unwrap();

        assert_eq!(ids(&index.search("milk (2 litres)").unwrap()), vec![1]);
    }

    #[test]
    fn parentheses_group_boolean_operators() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "A", Some("milk eggs")).unwrap();
        index.insert(NoteId::new(2), "B", Some("milk bread")).unwrap();
        index.insert(NoteId::new(3), "C", Some("eggs bread")).unwrap();

        let mut found = ids(&index.search("milk (eggs OR bread)").unwrap());
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn leading_star_and_unusual_whitespace_are_ignored() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "Budget meeting", None).unwrap();

        assert_eq!(ids(&index.search("*budget").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("budget\u{00A0}meeting").unwrap()), vec![1]);
        assert_eq!(ids(&index.search("budg*").unwrap()), vec![1]);
    }

    #[test]
    fn unbalanced_quote_is_query_syntax_error() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        index.insert(NoteId::new(1), "Note", Some("milk")).unwrap();

        let err = index.search("\"milk").unwrap_err();
        assert!(matches!(err, Error::QuerySyntax(_)), "got {err:?}");
    }

    #[test]
    fn dangling_operator_is_query_syntax_error() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        let err = index.search("milk AND").unwrap_err();
        assert!(matches!(err, Error::QuerySyntax(_)), "got {err:?}");
    }

    #[test]
    fn indexed_ids_are_sorted() {
        let db = Database::in_memory().unwrap();
        let index = TextIndex::new(db.connection());

        for id in [4, 1, 3] {
            index.insert(NoteId::new(id), "n", None).unwrap();
        }

        assert_eq!(
            index.indexed_ids().unwrap(),
            vec![NoteId::new(1), NoteId::new(3), NoteId::new(4)]
        );
        assert_eq!(index.clear().unwrap(), 3);
        assert!(index.is_empty().unwrap());
    }
}
