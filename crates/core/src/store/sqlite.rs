//! SQLite-backed profile store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};

use super::{ProfileStore, StoreError};

/// SQLite-backed profile store.
pub struct SqliteProfileStore {
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    /// Create a new SQLite profile store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite profile store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profile_entries (
                user_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, key)
            );
            "#,
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("connection mutex poisoned".to_string()))
    }
}

impl ProfileStore for SqliteProfileStore {
    fn get(&self, user_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT value FROM profile_entries WHERE user_id = ? AND key = ?",
            params![user_id, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::ReadFailed(e.to_string())),
        }
    }

    fn put_many(&self, user_id: &str, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        for (key, value) in entries {
            tx.execute(
                "INSERT INTO profile_entries (user_id, key, value, updated_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![user_id, key, value, now],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    fn delete(&self, user_id: &str, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM profile_entries WHERE user_id = ? AND key = ?",
            params![user_id, key],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}
