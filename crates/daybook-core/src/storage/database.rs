//! SQLite entry store
//!
//! Owns the connection and every query against `entries`, the search index,
//! settings and the blob reclamation queue. History tables live in
//! `history`; cascading deletes in `cascade`.
//!
//! ## Tables
//!
//! - `entries` - one row per calendar day (`entry_date` is UNIQUE)
//! - `entries_fts` - full-text index over the plain text of each entry
//! - `app_settings` - key/value settings
//! - `blob_reclaim` - audio files waiting for physical removal

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::content::{fts_query, plain_text};
use crate::date_key::{EntryDate, Month};
use crate::models::{Entry, EMPTY_CONTENT};
use crate::storage::cascade::{delete_cascading, CascadeOutcome, CascadePolicy};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{self, migrate};
use crate::storage::{from_millis, to_millis};

const ENTRY_COLUMNS: &str = "id, entry_date, content, mood, mood_emoji, created_at, updated_at";

/// How long a statement waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of importing one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportedEntry {
    Inserted(Uuid),
    Overwritten(Uuid),
    Skipped(Uuid),
}

impl ImportedEntry {
    /// Id of the local row now holding the date
    pub fn local_id(&self) -> Uuid {
        match *self {
            ImportedEntry::Inserted(id)
            | ImportedEntry::Overwritten(id)
            | ImportedEntry::Skipped(id) => id,
        }
    }
}

/// SQLite-backed entry store
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open or create the database file and bring its schema up to date
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> StorageResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Current schema version
    pub fn schema_version(&self) -> StorageResult<i64> {
        Ok(schema::current_version(&self.conn)?)
    }

    // ==================== Entries ====================

    /// Create the entry for `date` or replace its content
    ///
    /// A single `INSERT ... ON CONFLICT` statement, so two writers racing on
    /// the same date can never both insert. The id and `created_at` of an
    /// existing row are kept.
    pub fn upsert_entry(&mut self, date: &EntryDate, content: &str) -> StorageResult<Entry> {
        let now = Utc::now().timestamp_millis();
        let tx = self.conn.transaction()?;

        let entry = tx
            .query_row(
                &format!(
                    "INSERT INTO entries (id, entry_date, content, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)
                     ON CONFLICT(entry_date) DO UPDATE
                     SET content = excluded.content, updated_at = excluded.updated_at
                     RETURNING {ENTRY_COLUMNS}"
                ),
                params![Uuid::new_v4().to_string(), date.as_str(), content, now],
                EntryRow::from_row,
            )
            .map_err(|e| conflict_or(e, date))?
            .into_entry()?;

        refresh_search_index(&tx, &entry)?;
        tx.commit()?;

        debug!("Saved entry {} ({} bytes)", date, content.len());
        Ok(entry)
    }

    /// Set or clear the mood for `date`
    ///
    /// Creates an entry with empty content when the day has none yet.
    pub fn set_mood(
        &mut self,
        date: &EntryDate,
        mood: Option<&str>,
        mood_emoji: Option<&str>,
    ) -> StorageResult<Entry> {
        let now = Utc::now().timestamp_millis();
        let tx = self.conn.transaction()?;

        let entry = tx
            .query_row(
                &format!(
                    "INSERT INTO entries (id, entry_date, content, mood, mood_emoji, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                     ON CONFLICT(entry_date) DO UPDATE
                     SET mood = excluded.mood, mood_emoji = excluded.mood_emoji,
                         updated_at = excluded.updated_at
                     RETURNING {ENTRY_COLUMNS}"
                ),
                params![
                    Uuid::new_v4().to_string(),
                    date.as_str(),
                    EMPTY_CONTENT,
                    mood,
                    mood_emoji,
                    now
                ],
                EntryRow::from_row,
            )
            .map_err(|e| conflict_or(e, date))?
            .into_entry()?;

        refresh_search_index(&tx, &entry)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Get the entry for a date
    pub fn get_entry(&self, date: &EntryDate) -> StorageResult<Option<Entry>> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_date = ?1"),
                params![date.as_str()],
                EntryRow::from_row,
            )
            .optional()?
            .map(EntryRow::into_entry)
            .transpose()
    }

    /// Get an entry by id
    pub fn get_entry_by_id(&self, id: &Uuid) -> StorageResult<Option<Entry>> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id.to_string()],
                EntryRow::from_row,
            )
            .optional()?
            .map(EntryRow::into_entry)
            .transpose()
    }

    /// Entries in a month, newest day first
    pub fn list_entries(&self, month: &Month) -> StorageResult<Vec<Entry>> {
        let (first, last) = month.bounds();
        self.query_entries(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM entries
                 WHERE entry_date BETWEEN ?1 AND ?2
                 ORDER BY entry_date DESC"
            ),
            params![first, last],
        )
    }

    /// Entries in a month with the given mood, newest day first
    pub fn list_entries_by_mood(&self, month: &Month, mood: &str) -> StorageResult<Vec<Entry>> {
        let (first, last) = month.bounds();
        self.query_entries(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM entries
                 WHERE entry_date BETWEEN ?1 AND ?2 AND mood = ?3
                 ORDER BY entry_date DESC"
            ),
            params![first, last, mood],
        )
    }

    /// Every entry, oldest day first
    pub fn all_entries(&self) -> StorageResult<Vec<Entry>> {
        self.query_entries(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY entry_date ASC"),
            [],
        )
    }

    /// Every date key, ascending
    pub fn entry_dates(&self) -> StorageResult<Vec<EntryDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT entry_date FROM entries ORDER BY entry_date ASC")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        keys.iter().map(|k| EntryDate::parse(k)).collect()
    }

    /// Full-text search, most relevant first
    ///
    /// Matches the plain text of the content and the mood. Empty queries
    /// return nothing.
    pub fn search_entries(&self, query: &str) -> StorageResult<Vec<Entry>> {
        let Some(fts) = fts_query(query) else {
            return Ok(Vec::new());
        };

        self.query_entries(
            r#"
            SELECT e.id, e.entry_date, e.content, e.mood, e.mood_emoji, e.created_at, e.updated_at
            FROM entries_fts
            JOIN entries e ON e.id = entries_fts.entry_id
            WHERE entries_fts MATCH ?1
            ORDER BY rank, e.entry_date DESC
            "#,
            params![fts],
        )
    }

    /// Number of rows holding a date (always 0 or 1)
    pub fn count_for_date(&self, date: &EntryDate) -> StorageResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE entry_date = ?1",
            params![date.as_str()],
            |row| row.get(0),
        )?)
    }

    /// Get entry count
    pub fn entry_count(&self) -> StorageResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?)
    }

    /// Delete the entry for `date`, resolving its history per `policy`
    ///
    /// Returns `None` when there was nothing to delete. Everything, including
    /// queueing orphaned blobs for reclamation, commits atomically.
    pub fn delete_entry(
        &mut self,
        date: &EntryDate,
        policy: CascadePolicy,
    ) -> StorageResult<Option<CascadeOutcome>> {
        let tx = self.conn.transaction()?;

        let Some(entry_id) = entry_id_for_date(&tx, date)? else {
            return Ok(None);
        };

        let outcome = delete_cascading(&tx, &entry_id, date, policy)?;
        tx.commit()?;

        debug!(
            "Deleted entry {} ({} ai operations, {} audio records, policy {:?})",
            date, outcome.ai_operations, outcome.audio_records, policy
        );
        Ok(Some(outcome))
    }

    /// Restore one entry from a snapshot
    ///
    /// Runs in its own transaction. Keeps the snapshot id unless another day
    /// already uses it locally.
    pub fn import_entry(&mut self, entry: &Entry, overwrite: bool) -> StorageResult<ImportedEntry> {
        let tx = self.conn.transaction()?;

        let outcome = match entry_id_for_date(&tx, &entry.entry_date)? {
            Some(existing) if overwrite => {
                tx.execute(
                    "UPDATE entries SET content = ?1, mood = ?2, mood_emoji = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![
                        entry.content,
                        entry.mood,
                        entry.mood_emoji,
                        to_millis(&entry.updated_at),
                        existing
                    ],
                )?;
                ImportedEntry::Overwritten(parse_uuid(&existing)?)
            }
            Some(existing) => ImportedEntry::Skipped(parse_uuid(&existing)?),
            None => {
                let id_taken = tx
                    .prepare("SELECT 1 FROM entries WHERE id = ?1")?
                    .exists(params![entry.id.to_string()])?;
                let id = if id_taken { Uuid::new_v4() } else { entry.id };

                tx.execute(
                    "INSERT INTO entries (id, entry_date, content, mood, mood_emoji, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        id.to_string(),
                        entry.entry_date.as_str(),
                        entry.content,
                        entry.mood,
                        entry.mood_emoji,
                        to_millis(&entry.created_at),
                        to_millis(&entry.updated_at),
                    ],
                )
                .map_err(|e| conflict_or(e, &entry.entry_date))?;
                ImportedEntry::Inserted(id)
            }
        };

        if !matches!(outcome, ImportedEntry::Skipped(_)) {
            let stored = tx
                .query_row(
                    &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                    params![outcome.local_id().to_string()],
                    EntryRow::from_row,
                )?
                .into_entry()?;
            refresh_search_index(&tx, &stored)?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    // ==================== Settings ====================

    /// Save an app setting
    pub fn set_setting(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    /// Get an app setting by key
    pub fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ==================== Blob reclamation queue ====================

    /// Blob paths still waiting for removal, oldest first
    pub fn pending_reclaims(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT audio_relpath FROM blob_reclaim ORDER BY queued_at, audio_relpath")?;
        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    /// Drop a blob from the queue once its file is gone
    pub fn clear_reclaim(&self, relpath: &str) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM blob_reclaim WHERE audio_relpath = ?1",
            params![relpath],
        )?;
        Ok(())
    }

    // ==================== Private helpers ====================

    fn query_entries<P: rusqlite::Params>(&self, sql: &str, params: P) -> StorageResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, EntryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }
}

// ==================== Internal structs ====================

struct EntryRow {
    id: String,
    entry_date: String,
    content: String,
    mood: Option<String>,
    mood_emoji: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entry_date: row.get(1)?,
            content: row.get(2)?,
            mood: row.get(3)?,
            mood_emoji: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_entry(self) -> StorageResult<Entry> {
        Ok(Entry {
            id: parse_uuid(&self.id)?,
            entry_date: EntryDate::parse(&self.entry_date)?,
            content: self.content,
            mood: self.mood,
            mood_emoji: self.mood_emoji,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

// ==================== Transaction helpers ====================

pub(crate) fn parse_uuid(value: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| StorageError::invalid("record id", value, "a UUID"))
}

fn entry_id_for_date(tx: &Transaction, date: &EntryDate) -> StorageResult<Option<String>> {
    Ok(tx
        .query_row(
            "SELECT id FROM entries WHERE entry_date = ?1",
            params![date.as_str()],
            |row| row.get(0),
        )
        .optional()?)
}

/// Replace the search row for an entry
fn refresh_search_index(tx: &Transaction, entry: &Entry) -> StorageResult<()> {
    let id = entry.id.to_string();
    tx.execute("DELETE FROM entries_fts WHERE entry_id = ?1", params![id])?;
    tx.execute(
        "INSERT INTO entries_fts (entry_id, body, mood) VALUES (?1, ?2, ?3)",
        params![
            id,
            plain_text(&entry.content),
            entry.mood.as_deref().unwrap_or_default()
        ],
    )?;
    Ok(())
}

/// Surface a uniqueness violation as a conflict rather than a raw SQLite error
fn conflict_or(err: rusqlite::Error, date: &EntryDate) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::ConstraintViolation => {
            StorageError::Conflict(format!("entry for {} violates a uniqueness constraint: {}", date, err))
        }
        _ => StorageError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(key: &str) -> EntryDate {
        EntryDate::parse(key).unwrap()
    }

    fn doc(text: &str) -> String {
        format!(
            r#"{{"type":"doc","content":[{{"type":"paragraph","content":[{{"type":"text","text":"{text}"}}]}}]}}"#
        )
    }

    #[test]
    fn test_upsert_then_get_round_trips() {
        let mut db = Database::open_in_memory().unwrap();
        let content = doc("a quiet morning");

        let saved = db.upsert_entry(&date("2026-01-01"), &content).unwrap();
        let fetched = db.get_entry(&date("2026-01-01")).unwrap().unwrap();

        assert_eq!(fetched.content, content);
        assert_eq!(fetched.id, saved.id);
        assert_eq!(fetched.entry_date.as_str(), "2026-01-01");
    }

    #[test]
    fn test_upsert_overwrites_same_date() {
        let mut db = Database::open_in_memory().unwrap();
        let day = date("2026-01-01");

        let first = db.upsert_entry(&day, "A").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = db.upsert_entry(&day, "B").unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(db.get_entry(&day).unwrap().unwrap().content, "B");
        assert_eq!(db.count_for_date(&day).unwrap(), 1);
    }

    #[test]
    fn test_padded_date_cannot_add_second_row() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_entry(&date("2026-01-01"), "A").unwrap();

        for padded in ["2026-01- 1", "2026- 1-01", "+026-01-01"] {
            assert!(EntryDate::parse(padded).is_err(), "{padded:?} accepted");
            let json = format!("\"{padded}\"");
            assert!(serde_json::from_str::<EntryDate>(&json).is_err());
        }

        assert_eq!(db.entry_count().unwrap(), 1);
        let january = db.list_entries(&Month::parse("2026-01").unwrap()).unwrap();
        assert_eq!(january.len(), 1);
    }

    #[test]
    fn test_get_missing_entry() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_entry(&date("2026-01-01")).unwrap().is_none());
    }

    #[test]
    fn test_content_is_stored_verbatim() {
        let mut db = Database::open_in_memory().unwrap();
        let day = date("2026-04-01");
        let content = "  line one\n\ttabbed \"quoted\" 'single' ünïcödé 🌧\n";

        db.upsert_entry(&day, content).unwrap();
        assert_eq!(db.get_entry(&day).unwrap().unwrap().content, content);
    }

    #[test]
    fn test_list_entries_by_month() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_entry(&date("2026-01-31"), "jan end").unwrap();
        db.upsert_entry(&date("2026-02-01"), "feb start").unwrap();
        db.upsert_entry(&date("2026-02-14"), "feb mid").unwrap();
        db.upsert_entry(&date("2026-03-01"), "mar start").unwrap();

        let feb = db.list_entries(&Month::parse("2026-02").unwrap()).unwrap();
        let keys: Vec<&str> = feb.iter().map(|e| e.entry_date.as_str()).collect();
        assert_eq!(keys, vec!["2026-02-14", "2026-02-01"]);

        assert!(db
            .list_entries(&Month::parse("2025-02").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_set_mood_creates_and_updates() {
        let mut db = Database::open_in_memory().unwrap();
        let day = date("2026-05-05");

        let created = db.set_mood(&day, Some("happy"), Some("😊")).unwrap();
        assert_eq!(created.content, EMPTY_CONTENT);
        assert_eq!(created.mood.as_deref(), Some("happy"));

        db.upsert_entry(&day, "wrote later").unwrap();
        let updated = db.set_mood(&day, Some("tired"), Some("😴")).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.content, "wrote later");
        assert_eq!(updated.mood_emoji.as_deref(), Some("😴"));

        let cleared = db.set_mood(&day, None, None).unwrap();
        assert!(cleared.mood.is_none());
    }

    #[test]
    fn test_list_entries_by_mood() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_mood(&date("2026-05-01"), Some("happy"), None).unwrap();
        db.set_mood(&date("2026-05-02"), Some("sad"), None).unwrap();
        db.set_mood(&date("2026-05-03"), Some("happy"), None).unwrap();

        let happy = db
            .list_entries_by_mood(&Month::parse("2026-05").unwrap(), "happy")
            .unwrap();
        let keys: Vec<&str> = happy.iter().map(|e| e.entry_date.as_str()).collect();
        assert_eq!(keys, vec!["2026-05-03", "2026-05-01"]);
    }

    #[test]
    fn test_search_entries() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_entry(&date("2026-01-01"), &doc("walked to the lighthouse"))
            .unwrap();
        db.upsert_entry(&date("2026-01-02"), &doc("rainy day indoors"))
            .unwrap();
        db.upsert_entry(&date("2026-01-03"), &doc("lighthouse lighthouse lighthouse again"))
            .unwrap();

        let results = db.search_entries("lighthouse").unwrap();
        assert_eq!(results.len(), 2);
        // Denser match ranks first
        assert_eq!(results[0].entry_date.as_str(), "2026-01-03");

        // Structure of the payload isn't searchable
        assert!(db.search_entries("paragraph").unwrap().is_empty());
    }

    #[test]
    fn test_search_follows_updates() {
        let mut db = Database::open_in_memory().unwrap();
        let day = date("2026-01-01");

        db.upsert_entry(&day, &doc("first draft")).unwrap();
        db.upsert_entry(&day, &doc("second version")).unwrap();

        assert!(db.search_entries("draft").unwrap().is_empty());
        assert_eq!(db.search_entries("version").unwrap().len(), 1);
    }

    #[test]
    fn test_search_tolerates_fts_syntax() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_entry(&date("2026-01-01"), "well-being: \"ok\"").unwrap();

        assert!(db.search_entries("NEAR( \"unbalanced").is_ok());
        assert!(db.search_entries("").unwrap().is_empty());
        assert_eq!(db.search_entries("well-being").unwrap().len(), 1);
    }

    #[test]
    fn test_search_matches_mood() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_mood(&date("2026-01-01"), Some("grateful"), None).unwrap();

        assert_eq!(db.search_entries("grateful").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_entry() {
        let mut db = Database::open_in_memory().unwrap();
        let day = date("2026-01-01");
        db.upsert_entry(&day, &doc("gone soon")).unwrap();

        let outcome = db.delete_entry(&day, CascadePolicy::Delete).unwrap();
        assert!(outcome.is_some());
        assert!(db.get_entry(&day).unwrap().is_none());
        assert!(db.search_entries("gone").unwrap().is_empty());

        let again = db.delete_entry(&day, CascadePolicy::Delete).unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_entry_dates_ascending() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_entry(&date("2026-03-01"), "c").unwrap();
        db.upsert_entry(&date("2026-01-01"), "a").unwrap();
        db.upsert_entry(&date("2026-02-01"), "b").unwrap();

        let keys: Vec<String> = db
            .entry_dates()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(keys, vec!["2026-01-01", "2026-02-01", "2026-03-01"]);
    }

    #[test]
    fn test_concurrent_upserts_keep_one_row() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("daybook.db");
        Database::open(&path).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut db = Database::open(&path).unwrap();
                    for n in 0..10 {
                        db.upsert_entry(&date("2026-01-01"), &format!("writer {i} pass {n}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_for_date(&date("2026-01-01")).unwrap(), 1);
        assert_eq!(db.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("daybook.db");

        {
            let mut db = Database::open(&path).unwrap();
            db.upsert_entry(&date("2026-01-01"), "persisted").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.get_entry(&date("2026-01-01")).unwrap().unwrap().content,
            "persisted"
        );
        assert_eq!(db.schema_version().unwrap(), crate::storage::SCHEMA_VERSION);
    }

    #[test]
    fn test_import_entry_modes() {
        let mut db = Database::open_in_memory().unwrap();
        let day = date("2026-01-01");
        let local = db.upsert_entry(&day, "local").unwrap();

        let mut incoming = Entry::new(day.clone(), "incoming");
        incoming.mood = Some("calm".to_string());

        let skipped = db.import_entry(&incoming, false).unwrap();
        assert_eq!(skipped, ImportedEntry::Skipped(local.id));
        assert_eq!(db.get_entry(&day).unwrap().unwrap().content, "local");

        let overwritten = db.import_entry(&incoming, true).unwrap();
        assert_eq!(overwritten, ImportedEntry::Overwritten(local.id));
        let stored = db.get_entry(&day).unwrap().unwrap();
        assert_eq!(stored.content, "incoming");
        assert_eq!(stored.mood.as_deref(), Some("calm"));
        assert_eq!(db.search_entries("incoming").unwrap().len(), 1);

        let fresh = Entry::new(date("2026-01-02"), "new day");
        let inserted = db.import_entry(&fresh, false).unwrap();
        assert_eq!(inserted, ImportedEntry::Inserted(fresh.id));
    }

    #[test]
    fn test_import_entry_reassigns_taken_id() {
        let mut db = Database::open_in_memory().unwrap();
        let local = db.upsert_entry(&date("2026-01-01"), "local").unwrap();

        let mut clash = Entry::new(date("2026-01-02"), "other day");
        clash.id = local.id;

        let outcome = db.import_entry(&clash, false).unwrap();
        assert!(matches!(outcome, ImportedEntry::Inserted(id) if id != local.id));
        assert_eq!(db.entry_count().unwrap(), 2);
    }

    #[test]
    fn test_settings() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_setting("theme").unwrap().is_none());

        db.set_setting("theme", "dark").unwrap();
        db.set_setting("theme", "light").unwrap();
        assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("light"));
    }
}
