//! Export document encoding and tolerant import parsing.
//!
//! # Responsibility
//! - Turn a snapshot into a self-describing JSON export document.
//! - Validate an incoming document and back-fill fields older versions omit.
//!
//! # Invariants
//! - Parsing never touches the store; the clock is injected.
//! - A validated import never contains a blank id, blank text or repeated id.
//! - `autoBackup` is only written for automatic backups.

use crate::model::snapshot::Snapshot;
use crate::model::todo::{is_valid_time, TodoId, TodoItem};
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Interchange format version written into every export.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Whether an export was requested by the user or produced by auto-backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Manual,
    Automatic,
}

/// Snapshot plus provenance metadata, as written to export files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub todos: Vec<TodoItem>,
    pub is_dark_mode: bool,
    pub auto_backup_enabled: bool,
    pub export_date: DateTime<Utc>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_backup: Option<bool>,
}

/// A named, encoded export ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

impl ExportFile {
    /// Serializes `snapshot` and names the file after `kind` and `now`.
    pub fn build(
        snapshot: &Snapshot,
        kind: BackupKind,
        now: DateTime<Utc>,
    ) -> serde_json::Result<Self> {
        let document = serialize(snapshot, now, kind);
        Ok(Self {
            file_name: export_file_name(kind, now),
            contents: to_json(&document)?,
        })
    }
}

/// Items and optional preference overrides extracted from an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImport {
    pub items: Vec<TodoItem>,
    /// `None` when the document does not carry the flag.
    pub is_dark_mode: Option<bool>,
    /// `None` when the document does not carry the flag.
    pub auto_backup_enabled: Option<bool>,
}

/// Import validation failures. The store is never modified when one occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Payload is not JSON, or not a JSON object.
    MalformedDocument(String),
    /// Required top-level field is absent or has the wrong shape.
    MissingField(&'static str),
    /// One `todos` entry cannot be accepted.
    CorruptItem { index: usize, reason: String },
    /// Two entries in the same document share an id.
    DuplicateId(TodoId),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedDocument(details) => {
                write!(f, "file is not a valid todo document: {details}")
            }
            Self::MissingField(field) => {
                write!(f, "todo document is missing a `{field}` list")
            }
            Self::CorruptItem { index, reason } => {
                write!(f, "todo entry #{} is damaged: {reason}", index + 1)
            }
            Self::DuplicateId(id) => write!(f, "todo document repeats id `{id}`"),
        }
    }
}

impl Error for ImportError {}

/// Builds the export document for `snapshot` at `now`.
pub fn serialize(snapshot: &Snapshot, now: DateTime<Utc>, kind: BackupKind) -> ExportDocument {
    ExportDocument {
        todos: snapshot.items.clone(),
        is_dark_mode: snapshot.is_dark_mode,
        auto_backup_enabled: snapshot.auto_backup_enabled,
        export_date: now,
        version: DOCUMENT_VERSION.to_string(),
        auto_backup: match kind {
            BackupKind::Manual => None,
            BackupKind::Automatic => Some(true),
        },
    }
}

/// Pretty-printed JSON with two-space indentation.
pub fn to_json(document: &ExportDocument) -> serde_json::Result<String> {
    serde_json::to_string_pretty(document)
}

/// File name convention for exports.
///
/// - Manual: `todo-backup-YYYY-MM-DD.json`
/// - Automatic: `todo-auto-backup-YYYY-MM-DDTHH-MM-SS-mmmZ.json`
pub fn export_file_name(kind: BackupKind, now: DateTime<Utc>) -> String {
    match kind {
        BackupKind::Manual => format!("todo-backup-{}.json", now.format("%Y-%m-%d")),
        BackupKind::Automatic => {
            let stamp = now
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .replace([':', '.'], "-");
            format!("todo-auto-backup-{stamp}.json")
        }
    }
}

/// Validates a raw document and back-fills optional item fields.
///
/// Missing `memo`/`time` become `""`, missing `completed` becomes `false` and a
/// missing or unreadable `createdAt` becomes `now`.
///
/// # Errors
/// - `MalformedDocument` when `raw` is not a JSON object.
/// - `MissingField("todos")` when `todos` is absent or not an array.
/// - `CorruptItem` when an entry lacks `id`/`text` or carries wrongly typed
///   fields.
/// - `DuplicateId` when an id appears twice.
pub fn parse(raw: &str, now: DateTime<Utc>) -> Result<ValidatedImport, ImportError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| ImportError::MalformedDocument(err.to_string()))?;
    let Value::Object(document) = value else {
        return Err(ImportError::MalformedDocument(
            "top-level value is not an object".to_string(),
        ));
    };

    let Some(Value::Array(entries)) = document.get("todos") else {
        return Err(ImportError::MissingField("todos"));
    };

    let mut seen = HashSet::with_capacity(entries.len());
    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let item = parse_entry(entry, now).map_err(|reason| ImportError::CorruptItem {
            index,
            reason,
        })?;
        if !seen.insert(item.id.clone()) {
            return Err(ImportError::DuplicateId(item.id));
        }
        items.push(item);
    }

    Ok(ValidatedImport {
        items,
        is_dark_mode: document.get("isDarkMode").and_then(Value::as_bool),
        auto_backup_enabled: document.get("autoBackupEnabled").and_then(Value::as_bool),
    })
}

fn parse_entry(entry: &Value, now: DateTime<Utc>) -> Result<TodoItem, String> {
    let Value::Object(fields) = entry else {
        return Err("entry is not an object".to_string());
    };

    let id = match fields.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err("missing `id`".to_string()),
    };

    let text = match fields.get("text") {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        _ => return Err("missing `text`".to_string()),
    };

    let time = optional_string(fields, "time")?;
    if !is_valid_time(&time) {
        return Err(format!("`time` must be HH:MM, got `{time}`"));
    }

    let completed = match fields.get("completed") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(value)) => *value,
        Some(_) => return Err("`completed` is not a boolean".to_string()),
    };

    Ok(TodoItem {
        id,
        text,
        memo: optional_string(fields, "memo")?,
        time,
        completed,
        created_at: created_at_or(fields.get("createdAt"), now),
    })
}

fn optional_string(fields: &Map<String, Value>, key: &str) -> Result<String, String> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(format!("`{key}` is not a string")),
    }
}

fn created_at_or(value: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    match value {
        None | Some(Value::Null) => now,
        Some(Value::String(text)) if text.is_empty() => now,
        Some(Value::String(text)) => match DateTime::parse_from_rfc3339(text) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(err) => {
                warn!("event=import_backfill module=codec status=skip field=createdAt error={err}");
                now
            }
        },
        Some(_) => {
            warn!("event=import_backfill module=codec status=skip field=createdAt error=not_a_string");
            now
        }
    }
}
