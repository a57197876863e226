use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::session::SessionState;

/// Well-known key of the active session slot.
pub const ACTIVE_SESSION_KEY: &str = "active_workout_session";

/// Durable single-slot persistence for the active session.
pub trait SessionStore {
    /// Overwrite the slot with `state`.
    fn save(&self, state: &SessionState) -> Result<(), StoreError>;
    /// Last saved state. Absent, unreadable and corrupt all load as `None`.
    fn load(&self) -> Option<SessionState>;
    /// Remove the slot. Idempotent, failures are logged.
    fn clear(&self);
}

fn decode(raw: &str) -> Option<SessionState> {
    match serde_json::from_str::<SessionState>(raw) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(error = %e, "discarding corrupt persisted session");
            None
        }
    }
}

/// SQLite-backed store: one row in a small key/value table.
#[derive(Debug)]
pub struct SqliteSessionStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(&path)?;
        Self::init(conn, Some(path))
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self { conn, path })
    }

    /// Database file in use, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read_raw(&self) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                [ACTIVE_SESSION_KEY],
                |row| row.get(0),
            )
            .optional()
    }

    /// Write a raw payload into the slot, bypassing serialization.
    pub fn write_raw(&self, raw: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![ACTIVE_SESSION_KEY, raw, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let raw = serde_json::to_string(state)?;
        self.write_raw(&raw)
    }

    fn load(&self) -> Option<SessionState> {
        match self.read_raw() {
            Ok(Some(raw)) => decode(&raw),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to read persisted session");
                None
            }
        }
    }

    fn clear(&self) {
        match self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", [ACTIVE_SESSION_KEY])
        {
            Ok(removed) => debug!(removed, "cleared persisted session"),
            Err(e) => warn!(error = %e, "failed to clear persisted session"),
        }
    }
}

#[derive(Debug, Default)]
struct MemorySlot {
    raw: Option<String>,
    saves: usize,
    fail_writes: bool,
}

/// Process-local store. Clones share one slot, so a test can hand a clone to
/// a manager, drop the manager, and build a new one over the same data.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<MemorySlot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an arbitrary payload, e.g. a corrupt one.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        let store = Self::new();
        store.lock().raw = Some(raw.into());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    pub fn raw(&self) -> Option<String> {
        self.lock().raw.clone()
    }

    /// Make subsequent writes fail with [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let raw = serde_json::to_string(state)?;
        let mut slot = self.lock();
        if slot.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        slot.raw = Some(raw);
        slot.saves += 1;
        Ok(())
    }

    fn load(&self) -> Option<SessionState> {
        let raw = self.lock().raw.clone()?;
        decode(&raw)
    }

    fn clear(&self) {
        self.lock().raw = None;
    }
}
