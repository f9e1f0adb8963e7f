//! SQLite-backed content store.
//!
//! Blocking `rusqlite` calls run on the tokio blocking pool. The identity
//! index is deliberately non-unique: legacy imports may carry duplicates that
//! the maintenance passes are expected to find and remove.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{
    Connection,
    params,
};
use tracing::{
    debug,
    info,
};

use super::{
    ContentFilter,
    ContentStore,
    StoreError,
};
use crate::types::{
    ContentEntry,
    EntryId,
    NewContentEntry,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS content_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page TEXT NOT NULL,
    section TEXT NOT NULL,
    key TEXT NOT NULL,
    locale TEXT NOT NULL,
    value TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_content_identity
    ON content_entries(locale, page, section, key);
";

/// Content store persisted in a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or the schema cannot be created.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %db_path.display(), "Content store opened");
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Appends rows without the identity check.
    ///
    /// # Errors
    /// Returns an error if an insert fails; earlier rows of the call are rolled back.
    pub async fn insert_raw(&self, entries: Vec<NewContentEntry>) -> Result<Vec<EntryId>, StoreError> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(entries.len());
            for entry in &entries {
                ids.push(insert_row(&tx, entry)?);
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
    }

    async fn run<T, F>(&self, job: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            job(&mut guard)
        })
        .await?
    }
}

fn insert_row(conn: &Connection, entry: &NewContentEntry) -> Result<EntryId, StoreError> {
    conn.execute(
        "INSERT INTO content_entries (page, section, key, locale, value)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![entry.page, entry.section, entry.key, entry.locale, entry.value],
    )?;
    Ok(EntryId(conn.last_insert_rowid()))
}

/// Builds the `WHERE` clause for a filter; unset fields compare against NULL
/// and always match.
const FILTER_CLAUSE: &str = "(?1 IS NULL OR locale = ?1)
    AND (?2 IS NULL OR page = ?2)
    AND (?3 IS NULL OR section = ?3)
    AND (?4 IS NULL OR key = ?4)";

impl ContentStore for SqliteStore {
    async fn fetch(&self, filter: &ContentFilter) -> Result<Vec<ContentEntry>, StoreError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, page, section, key, locale, value FROM content_entries
                 WHERE {FILTER_CLAUSE} ORDER BY id"
            ))?;
            let rows = stmt.query_map(
                params![filter.locale, filter.page, filter.section, filter.key],
                |row| {
                    Ok(ContentEntry {
                        id: EntryId(row.get(0)?),
                        page: row.get(1)?,
                        section: row.get(2)?,
                        key: row.get(3)?,
                        locale: row.get(4)?,
                        value: row.get(5)?,
                    })
                },
            )?;
            let entries = rows.collect::<Result<Vec<_>, _>>()?;
            debug!(count = entries.len(), "Fetched content rows");
            Ok(entries)
        })
        .await
    }

    async fn upsert(&self, entries: &[NewContentEntry]) -> Result<usize, StoreError> {
        let entries = entries.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for entry in &entries {
                let updated = tx.execute(
                    "UPDATE content_entries SET value = ?5
                     WHERE page = ?1 AND section = ?2 AND key = ?3 AND locale = ?4",
                    params![entry.page, entry.section, entry.key, entry.locale, entry.value],
                )?;
                if updated == 0 {
                    insert_row(&tx, entry)?;
                }
            }
            tx.commit()?;
            Ok(entries.len())
        })
        .await
    }

    async fn update_key(&self, id: EntryId, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.run(move |conn| {
            let updated =
                conn.execute("UPDATE content_entries SET key = ?1 WHERE id = ?2", params![key, id.0])?;
            if updated == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_ids(&self, ids: &[EntryId]) -> Result<usize, StoreError> {
        let ids = ids.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            {
                let mut stmt = tx.prepare("DELETE FROM content_entries WHERE id = ?1")?;
                for id in &ids {
                    removed += stmt.execute(params![id.0])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn delete_where(&self, filter: &ContentFilter) -> Result<usize, StoreError> {
        if filter.is_unscoped() {
            return Err(StoreError::UnscopedDelete);
        }
        let filter = filter.clone();
        self.run(move |conn| {
            let removed = conn.execute(
                &format!("DELETE FROM content_entries WHERE {FILTER_CLAUSE}"),
                params![filter.locale, filter.page, filter.section, filter.key],
            )?;
            Ok(removed)
        })
        .await
    }
}
