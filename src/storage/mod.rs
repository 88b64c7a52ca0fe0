use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};

mod schema;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("opening key-value database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("key-value database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("encoding value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous string-to-string store backing notes and preferences.
///
/// Implementations are last-write-wins; there is exactly one writer.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    fn connect(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&*self.db_path).map_err(|source| StorageError::Open {
            path: self.db_path.to_path_buf(),
            source,
        })?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

}

impl KeyValueStore for StorageHandle {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        })
    }
}

/// In-process store used by tests and by callers that do not want disk I/O.
///
/// Clones share the same map, so a test can keep one clone to inspect what
/// a store persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .inner
            .lock()
            .entries
            .insert(key.to_string(), value.to_string());
        store
    }

    /// Makes every subsequent `set` fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.lock().entries.get(key).cloned()
    }

    /// Number of `set` calls that reached the map.
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StorageError::Unavailable(format!("write to {key} rejected")));
        }
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "key-value store ready");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<(), StorageError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        ConfigPaths {
            config_dir: base.join("config"),
            config_file: base.join("config/config.toml"),
            data_dir: base.join("data"),
            database_path: base.join("data/notes.db"),
            log_dir: base.join("state/logs"),
            state_dir: base.join("state"),
        }
    }

    fn init_storage() -> anyhow::Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let handle = init(&paths, &StorageOptions::default())?;
        Ok((temp, handle))
    }

    #[test]
    fn set_then_get_returns_latest_value() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        assert_eq!(storage.get("notes")?, None);

        storage.set("notes", "[]")?;
        storage.set("notes", "[1]")?;
        assert_eq!(storage.get("notes")?.as_deref(), Some("[1]"));
        Ok(())
    }

    #[test]
    fn values_survive_a_fresh_handle() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        init(&paths, &StorageOptions::default())?.set("theme", "dark")?;

        let reopened = init(&paths, &StorageOptions::default())?;
        assert_eq!(reopened.get("theme")?.as_deref(), Some("dark"));
        assert_eq!(reopened.get("notes")?, None);
        Ok(())
    }

    #[test]
    fn keys_are_independent() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.set("notes", "[]")?;
        storage.set("theme", "light")?;

        storage.set("notes", "[2]")?;
        assert_eq!(storage.get("notes")?.as_deref(), Some("[2]"));
        assert_eq!(storage.get("theme")?.as_deref(), Some("light"));
        Ok(())
    }

    #[test]
    fn note_collection_round_trips_through_sqlite() -> anyhow::Result<()> {
        use crate::store::{NotePatch, NoteStore};

        let (_temp, storage) = init_storage()?;
        let mut notes = NoteStore::load(storage.clone(), "notes");
        let first = notes.create();
        notes.update(&first, NotePatch::title("Plan").with_content("ship it"));
        notes.create();

        let reloaded = NoteStore::load(storage, "notes");
        assert_eq!(reloaded.notes(), notes.notes());
        assert_eq!(reloaded.selection(), None);
        Ok(())
    }

    #[test]
    fn memory_store_clones_share_entries() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let observer = store.clone();
        store.set("theme", "dark")?;
        assert_eq!(observer.raw("theme").as_deref(), Some("dark"));
        assert_eq!(observer.write_count(), 1);
        Ok(())
    }

    #[test]
    fn memory_store_can_reject_writes() {
        let store = MemoryStore::with_entry("theme", "light");
        store.set_fail_writes(true);
        assert_matches!(store.set("theme", "dark"), Err(StorageError::Unavailable(_)));
        assert_eq!(store.raw("theme").as_deref(), Some("light"));
    }
}
