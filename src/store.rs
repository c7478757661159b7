/*!
 * Injected key-value storage.
 *
 * The rule cache and the credential rotation records live here instead of in
 * global state, so the pipeline can run against an in-memory map in tests
 * and a SQLite file in the command-line tool.
 */

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "fictrans.db";

/// Default directory under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "fictrans";

/// String-valued storage shared by the pipeline components
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a JSON value; undecodable entries read as absent
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!("Ignoring undecodable store entry '{}': {}", key, e);
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).context("Failed to serialize store value")?;
    store.set(key, &raw)
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// SQLite-backed store persisting across runs
#[derive(Debug)]
pub struct SqliteStore {
    db_path: PathBuf,
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the store at the default location
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory: {:?}", parent))?;
        }

        info!("Opening key-value store at: {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open store: {:?}", db_path))?;
        Self::initialize(&conn)?;

        Ok(Self {
            db_path,
            connection: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory store")?;
        Self::initialize(&conn)?;
        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Mutex::new(conn),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow!("Could not determine a data directory"))?;
        Ok(base.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn initialize(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .context("Failed to initialize store schema")?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connection.lock();
        conn.query_row(
            "SELECT value FROM kv_entries WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .with_context(|| format!("Failed to read store key '{}'", key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )
        .with_context(|| format!("Failed to write store key '{}'", key))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.connection.lock();
        conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .with_context(|| format!("Failed to delete store key '{}'", key))?;
        Ok(())
    }
}
