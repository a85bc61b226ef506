//! Key-value storage backends
//!
//! `SqliteKeyValueStore` persists entries in a single `kv` table keyed by
//! (namespace, key), so several tools can share one database file.
//! Uses r2d2 connection pooling; WAL mode lets readers proceed during writes.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use thiserror::Error;

use crate::interface::{KeyValueStore, SonderError};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

pub struct SqliteKeyValueStore {
    pool: Pool<SqliteConnectionManager>,
    namespace: String,
}

impl SqliteKeyValueStore {
    /// Open or create the database at `path`, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P, namespace: &str) -> DatabaseResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA busy_timeout=2000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(4).build(manager)?;
        Self::with_pool(pool, namespace)
    }

    /// Open a private in-memory database
    pub fn open_in_memory(namespace: &str) -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory();
        // In-memory needs single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::with_pool(pool, namespace)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>, namespace: &str) -> DatabaseResult<Self> {
        let store = Self {
            pool,
            namespace: namespace.to_string(),
        };
        store.setup_schema()?;
        Ok(store)
    }

    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updatedAt TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (namespace, key)
            );
        "#,
        )?;
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get_value(&self, key: &str) -> DatabaseResult<Option<String>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_value(&self, key: &str, value: &str) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value, updatedAt = datetime('now')",
            params![self.namespace, key, value],
        )?;
        Ok(())
    }

    pub fn remove_value(&self, key: &str) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: String) -> Result<Option<String>, SonderError> {
        Ok(self.get_value(&key)?)
    }

    fn set(&self, key: String, value: String) -> Result<(), SonderError> {
        Ok(self.set_value(&key, &value)?)
    }
}

/// Non-durable store for tests and hosts without storage
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.entries.lock().insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: String) -> Result<Option<String>, SonderError> {
        Ok(self.entries.lock().get(&key).cloned())
    }

    fn set(&self, key: String, value: String) -> Result<(), SonderError> {
        self.entries.lock().insert(key, value);
        Ok(())
    }
}
