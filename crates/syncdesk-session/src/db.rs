use rusqlite::Connection;

use crate::error::Result;

/// Initialise the key-value table backing [`crate::store::SqliteStore`].
///
/// Safe to call on every startup (`IF NOT EXISTS`).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key        TEXT NOT NULL PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}
