//! Todo item model and draft validation.
//!
//! # Responsibility
//! - Define `TodoItem`, the canonical record used everywhere in core.
//! - Normalize and validate user-editable fields before they reach the store.
//!
//! # Invariants
//! - `text` is never empty after trim.
//! - `time` is either empty or a 24-hour `HH:MM` value.
//! - `created_at` carries millisecond precision for items created here.

use chrono::{DateTime, SubsecRound, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static TIME_OF_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])$").expect("valid time regex"));

/// Stable item identifier.
///
/// Generated ids are UUID v4 strings; imported ids are kept verbatim.
pub type TodoId = String;

/// One todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: TodoId,
    pub text: String,
    pub memo: String,
    /// 24-hour `HH:MM`, or empty when no time is attached.
    pub time: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl TodoItem {
    /// Builds a fresh, not-yet-completed item from a validated draft.
    pub fn from_draft(id: TodoId, draft: TodoDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text: draft.text,
            memo: draft.memo,
            time: draft.time,
            completed: false,
            created_at,
        }
    }

    /// Replaces the user-editable fields, keeping identity and completion.
    pub fn apply_draft(&mut self, draft: TodoDraft) {
        self.text = draft.text;
        self.memo = draft.memo;
        self.time = draft.time;
    }
}

/// User-editable fields of an item, as typed into an add or edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoDraft {
    pub text: String,
    pub memo: String,
    pub time: String,
}

impl TodoDraft {
    pub fn new(text: impl Into<String>, memo: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            memo: memo.into(),
            time: time.into(),
        }
    }

    /// Text-only draft with empty memo and time.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, "", "")
    }

    /// Trims text/memo/time and validates the result.
    ///
    /// # Errors
    /// - `EmptyText` when text is blank after trim.
    /// - `InvalidTime` when time is non-empty and not `HH:MM`.
    pub fn normalized(self) -> Result<Self, TodoValidationError> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(TodoValidationError::EmptyText);
        }

        let time = self.time.trim().to_string();
        if !is_valid_time(&time) {
            return Err(TodoValidationError::InvalidTime(time));
        }

        Ok(Self {
            text,
            memo: self.memo.trim().to_string(),
            time,
        })
    }
}

/// Validation errors for user-editable item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    EmptyText,
    InvalidTime(String),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "todo text must not be blank"),
            Self::InvalidTime(value) => {
                write!(f, "time must be empty or HH:MM (24-hour), got `{value}`")
            }
        }
    }
}

impl Error for TodoValidationError {}

/// Returns whether `time` is empty or a valid 24-hour `HH:MM` value.
pub fn is_valid_time(time: &str) -> bool {
    time.is_empty() || TIME_OF_DAY_RE.is_match(time)
}

/// Splits a valid `HH:MM` value into hour and the raw minute text.
pub(crate) fn split_time(time: &str) -> Option<(u32, &str)> {
    let captures = TIME_OF_DAY_RE.captures(time)?;
    let hour = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let minutes = captures.get(2)?.as_str();
    Some((hour, minutes))
}

/// Current wall-clock time at the precision items are stored with.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
