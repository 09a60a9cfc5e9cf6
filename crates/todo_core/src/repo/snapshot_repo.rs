//! Snapshot persistence contracts and implementations.
//!
//! # Responsibility
//! - Save and load the full application snapshot as one unit.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `save` replaces the previously stored snapshot atomically.
//! - `load` returns `None` until the first `save`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::snapshot::Snapshot;
use crate::model::todo::TodoItem;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

const SETTING_DARK_MODE: &str = "is_dark_mode";
const SETTING_AUTO_BACKUP: &str = "auto_backup_enabled";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for snapshot save/load.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key-value style save/load of the whole snapshot.
pub trait SnapshotRepository {
    fn save(&self, snapshot: &Snapshot) -> RepoResult<()>;
    fn load(&self) -> RepoResult<Option<Snapshot>>;
}

/// Process-memory snapshot storage.
///
/// Clones share the same slot, so a test can keep a handle after passing one
/// into a session.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotRepository {
    slot: Rc<RefCell<Option<Snapshot>>>,
}

impl MemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with an already-stored snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(snapshot))),
        }
    }
}

impl SnapshotRepository for MemorySnapshotRepository {
    fn save(&self, snapshot: &Snapshot) -> RepoResult<()> {
        *self.slot.borrow_mut() = Some(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> RepoResult<Option<Snapshot>> {
        Ok(self.slot.borrow().clone())
    }
}

/// SQLite-backed snapshot storage.
pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    /// Wraps a connection returned by `db::open_db` / `db::open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn save(&self, snapshot: &Snapshot) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM todos;", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO todos (position, id, text, memo, time, completed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for (position, item) in snapshot.items.iter().enumerate() {
                insert.execute(params![
                    position as i64,
                    item.id.as_str(),
                    item.text.as_str(),
                    item.memo.as_str(),
                    item.time.as_str(),
                    bool_to_int(item.completed),
                    item.created_at.to_rfc3339(),
                ])?;
            }
        }

        let mut upsert = tx.prepare(
            "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        )?;
        upsert.execute(params![SETTING_DARK_MODE, bool_to_int(snapshot.is_dark_mode)])?;
        upsert.execute(params![
            SETTING_AUTO_BACKUP,
            bool_to_int(snapshot.auto_backup_enabled)
        ])?;
        drop(upsert);

        tx.commit()?;
        Ok(())
    }

    fn load(&self) -> RepoResult<Option<Snapshot>> {
        let dark_mode = self.read_setting(SETTING_DARK_MODE)?;
        let auto_backup = self.read_setting(SETTING_AUTO_BACKUP)?;
        if dark_mode.is_none() && auto_backup.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, text, memo, time, completed, created_at
             FROM todos
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_todo_row(row)?);
        }

        Ok(Some(Snapshot {
            items,
            is_dark_mode: dark_mode.unwrap_or(false),
            auto_backup_enabled: auto_backup.unwrap_or(false),
        }))
    }
}

impl SqliteSnapshotRepository<'_> {
    fn read_setting(&self, key: &str) -> RepoResult<Option<bool>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM app_settings WHERE key = ?1;")?;
        let mut rows = stmt.query([key])?;
        let stored: Option<i64> = match rows.next()? {
            Some(row) => Some(row.get(0)?),
            None => None,
        };
        stored
            .map(|value| int_to_bool(value, "app_settings.value"))
            .transpose()
    }
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<TodoItem> {
    let created_text: String = row.get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_text)
        .map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{created_text}` in todos.created_at"
            ))
        })?
        .with_timezone(&Utc);

    let completed = int_to_bool(row.get("completed")?, "todos.completed")?;

    Ok(TodoItem {
        id: row.get("id")?,
        text: row.get("text")?,
        memo: row.get("memo")?,
        time: row.get("time")?,
        completed,
        created_at,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
