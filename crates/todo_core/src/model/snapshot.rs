//! Persisted application state.

use crate::model::todo::TodoItem;
use serde::{Deserialize, Serialize};

/// Complete persisted state: items plus the two user preferences.
///
/// Missing keys deserialize to empty list / `false` / `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    #[serde(rename = "todos")]
    pub items: Vec<TodoItem>,
    pub is_dark_mode: bool,
    pub auto_backup_enabled: bool,
}
