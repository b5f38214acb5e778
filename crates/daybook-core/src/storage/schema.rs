//! SQLite schema and migrations
//!
//! The schema evolves through an ordered list of migrations. Each one runs in
//! its own transaction together with its `schema_migrations` ledger row, so a
//! crash leaves either the whole step applied and recorded or nothing at all.
//! Every step is also written to be safe to run twice (`IF NOT EXISTS`,
//! column guards), which lets a database whose ledger was lost or rolled back
//! catch up without damage.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info};

use crate::content::plain_text;
use crate::storage::error::MigrationError;
use crate::storage::from_millis;

/// Highest schema version this build knows how to use
pub const SCHEMA_VERSION: i64 = 6;

/// One applied row of the migration ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion {
    pub version: i64,
    pub applied_at: DateTime<Utc>,
}

struct Migration {
    version: i64,
    name: &'static str,
    apply: fn(&Transaction) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "entries",
        apply: create_entries,
    },
    Migration {
        version: 2,
        name: "ai_operations",
        apply: create_ai_operations,
    },
    Migration {
        version: 3,
        name: "entry_mood",
        apply: add_entry_mood,
    },
    Migration {
        version: 4,
        name: "entries_fts",
        apply: create_search_index,
    },
    Migration {
        version: 5,
        name: "audio_records",
        apply: create_audio_records,
    },
    Migration {
        version: 6,
        name: "app_settings",
        apply: create_app_settings,
    },
];

const LEDGER: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at INTEGER NOT NULL
    );
"#;

/// Bring the database up to `SCHEMA_VERSION`
///
/// Returns the versions applied by this call (empty when already current).
/// Refuses to touch a database that records a version newer than this build.
pub fn migrate(conn: &mut Connection) -> Result<Vec<i64>, MigrationError> {
    conn.execute_batch(LEDGER).map_err(MigrationError::Ledger)?;

    let applied = applied_versions(conn).map_err(MigrationError::Ledger)?;
    if let Some(&found) = applied.iter().max() {
        if found > SCHEMA_VERSION {
            return Err(MigrationError::UnknownVersion {
                found,
                supported: SCHEMA_VERSION,
            });
        }
    }

    let mut newly_applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        let failed = |source| MigrationError::Failed {
            version: migration.version,
            name: migration.name,
            source,
        };

        debug!("Applying migration {} ({})", migration.version, migration.name);
        let tx = conn.transaction().map_err(failed)?;
        (migration.apply)(&tx).map_err(failed)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![migration.version, Utc::now().timestamp_millis()],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        newly_applied.push(migration.version);
    }

    if !newly_applied.is_empty() {
        info!("Database migrated to schema version {}", SCHEMA_VERSION);
    }

    Ok(newly_applied)
}

/// Get the current schema version (0 for a fresh database)
pub fn current_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}

/// Full ledger, oldest first
pub fn ledger(conn: &Connection) -> rusqlite::Result<Vec<SchemaVersion>> {
    let mut stmt =
        conn.prepare("SELECT version, applied_at FROM schema_migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| {
        Ok(SchemaVersion {
            version: row.get(0)?,
            applied_at: from_millis(row.get(1)?),
        })
    })?;
    rows.collect()
}

fn applied_versions(conn: &Connection) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt.query_map([], |row| row.get(0))?;
    versions.collect()
}

fn column_exists(tx: &Transaction, table: &str, column: &str) -> rusqlite::Result<bool> {
    tx.prepare("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2")?
        .exists(params![table, column])
}

// ==================== Migrations ====================

fn create_entries(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            entry_date TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at);
        "#,
    )
}

fn create_ai_operations(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS ai_operations (
            id TEXT PRIMARY KEY,
            entry_id TEXT REFERENCES entries(id) ON DELETE CASCADE,
            orphaned_from TEXT,
            op_type TEXT NOT NULL,
            original_text TEXT NOT NULL,
            result_text TEXT NOT NULL,
            provider TEXT NOT NULL,
            model TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_ai_operations_entry_id ON ai_operations(entry_id);
        CREATE INDEX IF NOT EXISTS idx_ai_operations_created_at ON ai_operations(created_at);
        "#,
    )
}

fn add_entry_mood(tx: &Transaction) -> rusqlite::Result<()> {
    if !column_exists(tx, "entries", "mood")? {
        tx.execute_batch("ALTER TABLE entries ADD COLUMN mood TEXT;")?;
    }
    if !column_exists(tx, "entries", "mood_emoji")? {
        tx.execute_batch("ALTER TABLE entries ADD COLUMN mood_emoji TEXT;")?;
    }
    tx.execute_batch("CREATE INDEX IF NOT EXISTS idx_entries_mood ON entries(mood);")
}

fn create_search_index(tx: &Transaction) -> rusqlite::Result<()> {
    // Maintained by the store alongside every entry write, so the indexed
    // body can be the plain text rather than the raw payload.
    tx.execute_batch(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
            entry_id UNINDEXED,
            body,
            mood
        );

        DELETE FROM entries_fts;
        "#,
    )?;

    let rows: Vec<(String, String, Option<String>)> = {
        let mut stmt = tx.prepare("SELECT id, content, mood FROM entries")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut insert =
        tx.prepare("INSERT INTO entries_fts (entry_id, body, mood) VALUES (?1, ?2, ?3)")?;
    for (id, content, mood) in rows {
        insert.execute(params![id, plain_text(&content), mood.unwrap_or_default()])?;
    }

    Ok(())
}

fn create_audio_records(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS audio_records (
            id TEXT PRIMARY KEY,
            entry_id TEXT REFERENCES entries(id) ON DELETE CASCADE,
            orphaned_from TEXT,
            text TEXT NOT NULL,
            audio_relpath TEXT NOT NULL,
            voice TEXT,
            speed REAL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audio_records_entry_id ON audio_records(entry_id);

        -- Blobs whose owner is gone and whose file still has to be removed
        CREATE TABLE IF NOT EXISTS blob_reclaim (
            audio_relpath TEXT PRIMARY KEY,
            queued_at INTEGER NOT NULL
        );
        "#,
    )
}

fn create_app_settings(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
}
