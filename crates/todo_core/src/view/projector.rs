//! Pure view-model projection.
//!
//! # Responsibility
//! - Derive rows, counts and empty-state from items and the edit cursor.
//! - Format time-of-day values for display.
//! - Describe which row actions a renderer may offer.
//!
//! # Invariants
//! - `project` has no side effects; equal inputs give equal outputs.
//! - `pending_count == total_count - completed_count`.
//! - At most one row has `editing == true`.

use crate::model::todo::{split_time, TodoId, TodoItem};
use crate::service::session::Intent;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Display language for 12-hour time labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeLocale {
    /// `9:05 AM`
    #[default]
    English,
    /// `오전 9:05`
    Korean,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark_mode(is_dark_mode: bool) -> Self {
        if is_dark_mode {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

/// Inputs besides items and cursor that shape the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionOptions {
    pub is_dark_mode: bool,
    pub auto_backup_enabled: bool,
    pub time_locale: TimeLocale,
}

/// Everything a renderer needs to draw the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub rows: Vec<RowView>,
    pub total_count: usize,
    pub completed_count: usize,
    pub pending_count: usize,
    pub is_empty: bool,
    pub theme: Theme,
    pub auto_backup_enabled: bool,
}

/// One rendered item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: TodoId,
    pub text: String,
    pub memo: String,
    /// Raw `HH:MM` value, used to prefill the edit input.
    pub time: String,
    /// 12-hour label; `None` when the item has no time.
    pub time_label: Option<String>,
    pub completed: bool,
    pub editing: bool,
    pub show_memo: bool,
    pub show_time: bool,
}

const IDLE_ACTIONS: &[RowAction] = &[RowAction::Toggle, RowAction::Edit, RowAction::Delete];
const EDITING_ACTIONS: &[RowAction] = &[RowAction::Toggle, RowAction::Save, RowAction::Cancel];

impl RowView {
    /// Actions the renderer should expose for this row.
    pub fn actions(&self) -> &'static [RowAction] {
        if self.editing {
            EDITING_ACTIONS
        } else {
            IDLE_ACTIONS
        }
    }
}

/// Per-row action raised by a renderer, identified by a stable tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Toggle,
    Edit,
    Delete,
    Save,
    Cancel,
}

impl RowAction {
    /// Stable tag used by renderers to mark action controls.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Save => "save",
            Self::Cancel => "cancel",
        }
    }

    /// Maps a field-less action on row `id` to an intent.
    ///
    /// Returns `None` for `Save`, which needs the edited fields.
    pub fn to_intent(self, id: &str) -> Option<Intent> {
        match self {
            Self::Toggle => Some(Intent::Toggle(id.to_string())),
            Self::Edit => Some(Intent::StartEdit(id.to_string())),
            Self::Delete => Some(Intent::Delete(id.to_string())),
            Self::Cancel => Some(Intent::CancelEdit),
            Self::Save => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRowAction(pub String);

impl Display for UnknownRowAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown row action tag: `{}`", self.0)
    }
}

impl Error for UnknownRowAction {}

/// Parses a renderer action tag.
pub fn parse_row_action(tag: &str) -> Result<RowAction, UnknownRowAction> {
    match tag.trim() {
        "toggle" => Ok(RowAction::Toggle),
        "edit" => Ok(RowAction::Edit),
        "delete" => Ok(RowAction::Delete),
        "save" => Ok(RowAction::Save),
        "cancel" => Ok(RowAction::Cancel),
        other => Err(UnknownRowAction(other.to_string())),
    }
}

/// Projects items and edit cursor into a view-model.
pub fn project(
    items: &[TodoItem],
    edit_cursor: Option<&str>,
    options: &ProjectionOptions,
) -> ViewModel {
    let rows: Vec<RowView> = items
        .iter()
        .map(|item| project_row(item, edit_cursor, options.time_locale))
        .collect();
    let total_count = rows.len();
    let completed_count = rows.iter().filter(|row| row.completed).count();

    ViewModel {
        rows,
        total_count,
        completed_count,
        pending_count: total_count - completed_count,
        is_empty: total_count == 0,
        theme: Theme::from_dark_mode(options.is_dark_mode),
        auto_backup_enabled: options.auto_backup_enabled,
    }
}

fn project_row(item: &TodoItem, edit_cursor: Option<&str>, locale: TimeLocale) -> RowView {
    let editing = edit_cursor == Some(item.id.as_str());
    RowView {
        id: item.id.clone(),
        text: item.text.clone(),
        memo: item.memo.clone(),
        time: item.time.clone(),
        time_label: format_time(&item.time, locale),
        completed: item.completed,
        editing,
        show_memo: editing || !item.memo.is_empty(),
        show_time: editing || !item.time.is_empty(),
    }
}

/// Formats `HH:MM` as 12-hour time with a meridiem marker.
///
/// Returns `None` for empty or malformed input.
pub fn format_time(time: &str, locale: TimeLocale) -> Option<String> {
    let (hour, minutes) = split_time(time)?;
    let afternoon = hour >= 12;
    let display_hour = match hour {
        0 => 12,
        13.. => hour - 12,
        _ => hour,
    };

    Some(match locale {
        TimeLocale::English => {
            let meridiem = if afternoon { "PM" } else { "AM" };
            format!("{display_hour}:{minutes} {meridiem}")
        }
        TimeLocale::Korean => {
            let meridiem = if afternoon { "오후" } else { "오전" };
            format!("{meridiem} {display_hour}:{minutes}")
        }
    })
}
