use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("snapshot database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("snapshot could not be encoded: {0}")]
    Encode(serde_json::Error),
    #[error("snapshot for {key} is corrupted: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
}

/// Local mirror of each collection, one JSON snapshot per key.
pub struct SnapshotCache {
    conn: Mutex<Connection>,
}

impl SnapshotCache {
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
              key TEXT PRIMARY KEY,
              payload TEXT NOT NULL,
              saved_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn save<E: Serialize>(&self, key: &str, items: &[E]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(items).map_err(CacheError::Encode)?;
        self.save_raw(key, &payload)
    }

    /// Stores `payload` verbatim, without checking it parses.
    pub fn save_raw(&self, key: &str, payload: &str) -> Result<(), CacheError> {
        let now = Utc::now().to_rfc3339();
        self.conn.lock().execute(
            "INSERT INTO snapshots (key, payload, saved_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, saved_at = excluded.saved_at",
            params![key, payload, now],
        )?;
        Ok(())
    }

    /// `Ok(None)` when nothing was ever saved under `key`.
    pub fn load<E: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<E>>, CacheError> {
        let payload: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT payload FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            None => Ok(None),
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|source| CacheError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    pub fn saved_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, CacheError> {
        let saved_at: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT saved_at FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(saved_at
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc)))
    }
}
