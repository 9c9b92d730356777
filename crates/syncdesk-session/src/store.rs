//! Key-value persistence backends.
//!
//! The controller never touches storage directly; it goes through
//! [`crate::persistence::ActivityPersistence`], which sits on whichever
//! [`KeyValueStore`] the caller injects.

use std::sync::Mutex;

use dashmap::DashMap;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::{db::init_db, error::Result};

/// Minimal string key-value store that survives as long as its backend does.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`. Silent no-op if it is absent.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// SQLite-backed store; one row per key in `kv_store`.
///
/// Every console process on the machine that opens the same file shares
/// the same values, the way browser tabs share local storage.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap an open connection, creating the table if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::new(conn)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().expect("kv store mutex poisoned");
        let value = db
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().expect("kv store mutex poisoned");
        db.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock().expect("kv store mutex poisoned");
        let n = db.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])?;
        if n > 0 {
            debug!(key, "kv entry removed");
        }
        Ok(())
    }
}
