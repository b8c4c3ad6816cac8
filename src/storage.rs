use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::clock::SessionData;
use crate::error::{StorageError, StorageResult};
use crate::settings::Settings;

pub const TEXT_KEY: &str = "writeflow_text";
pub const SETTINGS_KEY: &str = "writeflow_settings";
pub const SESSION_KEY: &str = "writeflow_session";
const PROBE_KEY: &str = "__storage_test__";

/// Minimal string key-value backend
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// SQLite-backed store, one row per record
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-process store. Clones share contents, which lets tests "reload" by
/// handing a clone to a fresh session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|m| m.get(key).cloned())
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut m) = self.entries.lock() {
            m.insert(key.to_string(), value.to_string());
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let m = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))?;
        Ok(m.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut m = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))?;
        m.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut m = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))?;
        m.remove(key);
        Ok(())
    }
}

/// Backend that refuses every operation
#[derive(Debug, Clone, Default)]
pub struct UnavailableStore {
    pub reason: String,
}

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}

/// Best-effort access to the text, settings and session records.
///
/// Nothing here returns an error: failed reads look like absent records and
/// failed writes are logged. When the startup probe fails every call is a
/// no-op and the run is memory-only.
pub struct Persistence {
    backend: Option<Box<dyn KeyValueStore>>,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("available", &self.is_available())
            .finish()
    }
}

impl Persistence {
    /// Check the backend can round-trip a write before trusting it.
    pub fn probe(store: Box<dyn KeyValueStore>) -> Self {
        let check = store
            .set(PROBE_KEY, "test")
            .and_then(|_| store.remove(PROBE_KEY));
        match check {
            Ok(()) => {
                debug!("storage probe succeeded");
                Self {
                    backend: Some(store),
                }
            }
            Err(e) => {
                warn!(error = %e, "storage unavailable, running memory-only");
                Self::memory_only()
            }
        }
    }

    /// Open the SQLite database at `path`, falling back to memory-only.
    pub fn open_sqlite(path: &Path) -> Self {
        match SqliteStore::open(path) {
            Ok(store) => Self::probe(Box::new(store)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open database, running memory-only");
                Self::memory_only()
            }
        }
    }

    pub fn memory_only() -> Self {
        Self { backend: None }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let raw = match backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "failed to load record");
                return None;
            }
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "malformed record ignored");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|raw| backend.set(key, &raw));
        if let Err(e) = result {
            warn!(key, error = %e, "failed to save record");
        }
    }

    fn clear(&self, key: &str) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if let Err(e) = backend.remove(key) {
            warn!(key, error = %e, "failed to clear record");
        }
    }

    pub fn load_text(&self) -> Option<String> {
        self.load(TEXT_KEY)
    }

    pub fn save_text(&self, text: &str) {
        self.save(TEXT_KEY, text)
    }

    pub fn clear_text(&self) {
        self.clear(TEXT_KEY)
    }

    pub fn load_settings(&self) -> Option<Settings> {
        self.load(SETTINGS_KEY)
    }

    pub fn save_settings(&self, settings: &Settings) {
        self.save(SETTINGS_KEY, settings)
    }

    pub fn clear_settings(&self) {
        self.clear(SETTINGS_KEY)
    }

    pub fn load_session(&self) -> Option<SessionData> {
        self.load(SESSION_KEY)
    }

    pub fn save_session(&self, data: &SessionData) {
        self.save(SESSION_KEY, data)
    }

    pub fn clear_session(&self) {
        self.clear(SESSION_KEY)
    }
}

/// Default database location
pub fn default_db_path() -> PathBuf {
    crate::app_dirs::AppDirs::db_path().unwrap_or_else(|| PathBuf::from("writeflow.db"))
}
