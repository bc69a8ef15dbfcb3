use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;

use crate::config::StorageOptions;
use crate::error::{StoreError, StoreResult};
use crate::history::{History, Snapshot};
use crate::note::Note;

mod schema;

pub const NOTES_KEY: &str = "notes";
pub const HISTORY_KEY: &str = "versions";

/// String key/value surface the notebook persists into.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Writes several keys. Backends that can do so apply them atomically.
    fn set_many(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// SQLite-backed store. Cheap to clone; every call opens its own connection.
#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&*self.db_path)?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }
}

impl KeyValueStore for StorageHandle {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.with_connection(|conn| {
            upsert(conn, key, value)?;
            Ok(())
        })
    }

    fn set_many(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        for (key, value) in entries {
            upsert(&tx, key, value)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
}

/// In-process store. Clones share the same map, so a test can keep a handle and inspect what
/// the notebook wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        let mut map = self.entries.lock();
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}

/// State read back from a store.
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub notes: Vec<Note>,
    pub history: History,
    /// True when no usable history was found and a fresh "Initial state" was created.
    pub seeded: bool,
}

/// Reads the notes and history records. Missing or malformed records fall back independently:
/// notes to an empty collection (or the latest snapshot when history survived), history to a
/// single "Initial state" snapshot of the live notes. When both load, the cursor is placed on the
/// last snapshot equal to the live notes.
pub fn load_state<S: KeyValueStore + ?Sized>(store: &S) -> StoreResult<LoadedState> {
    let notes: Option<Vec<Note>> = decode(NOTES_KEY, store.get(NOTES_KEY)?);
    let snapshots: Option<Vec<Snapshot>> = decode(HISTORY_KEY, store.get(HISTORY_KEY)?);

    let state = match (notes, snapshots.and_then(History::from_snapshots)) {
        (Some(notes), Some(mut history)) => {
            if !history.settle_on(&notes) {
                tracing::warn!("live notes match no snapshot, cursor left at the latest one");
            }
            LoadedState {
                notes,
                history,
                seeded: false,
            }
        }
        (None, Some(history)) => {
            tracing::warn!("notes record unusable, restoring live notes from latest snapshot");
            LoadedState {
                notes: history.current().notes.clone(),
                history,
                seeded: false,
            }
        }
        (notes, None) => {
            let notes = notes.unwrap_or_default();
            LoadedState {
                history: History::seeded(&notes),
                notes,
                seeded: true,
            }
        }
    };
    Ok(state)
}

/// Writes both records in one `set_many` call.
pub fn save_state<S: KeyValueStore + ?Sized>(
    store: &S,
    notes: &[Note],
    history: &History,
) -> StoreResult<()> {
    let notes_json = serde_json::to_string(notes).map_err(|source| StoreError::Encode {
        key: NOTES_KEY,
        source,
    })?;
    let history_json =
        serde_json::to_string(history.snapshots()).map_err(|source| StoreError::Encode {
            key: HISTORY_KEY,
            source,
        })?;
    store.set_many(&[(NOTES_KEY, notes_json), (HISTORY_KEY, history_json)])
}

fn decode<T: DeserializeOwned>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(%err, key, "discarding malformed persisted record");
            None
        }
    }
}

pub fn init(storage: &StorageOptions) -> StoreResult<StorageHandle> {
    let db_path = &storage.database_path;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::DataDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let conn = Connection::open(db_path)?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::info!(path = %db_path.display(), "opened note store");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> StoreResult<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )?;
    Ok(())
}
