//! SQLite-backed audit store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, params};

use super::{CompletionRecord, RecordStore};
use crate::error::ProxyError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS completions (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    model TEXT,
    system_prompt TEXT NOT NULL,
    user_prompt TEXT NOT NULL,
    client_addr TEXT,
    user_agent TEXT,
    assistant_output TEXT
)";

/// Audit store over a single SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProxyError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database, useful for ephemeral deployments.
    pub fn open_in_memory() -> Result<Self, ProxyError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, ProxyError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ProxyError> {
        self.conn
            .lock()
            .map_err(|_| ProxyError::StorageError("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert(&self, record: &CompletionRecord) -> Result<(), ProxyError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO completions
                 (id, created_at, model, system_prompt, user_prompt, client_addr, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.created_at.to_rfc3339(),
                record.model,
                record.system_prompt,
                record.user_prompt,
                record.client_addr,
                record.user_agent,
            ],
        )?;
        Ok(())
    }

    async fn update_output(&self, id: &str, output: &str) -> Result<(), ProxyError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE completions SET assistant_output = ?2 WHERE id = ?1",
            params![id, output],
        )?;
        Ok(())
    }
}
