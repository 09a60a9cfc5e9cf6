//! In-memory ordered item store.
//!
//! # Responsibility
//! - Own the ordered todo sequence for one session.
//! - Apply create/toggle/update/delete and bulk replacement.
//!
//! # Invariants
//! - Item ids are unique across the store.
//! - New items are inserted at the front (most recent first).
//! - Write paths validate drafts before mutating anything.

use crate::model::todo::{now_millis, TodoDraft, TodoId, TodoItem, TodoValidationError};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by item store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(TodoValidationError),
    NotFound(TodoId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<TodoValidationError> for StoreError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Ordered collection of todo items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStore {
    items: Vec<TodoItem>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing sequence as-is.
    ///
    /// Callers are responsible for id uniqueness (loaded snapshots and
    /// validated imports already guarantee it).
    pub fn from_items(items: Vec<TodoItem>) -> Self {
        Self { items }
    }

    /// Creates a new item at the front of the list.
    ///
    /// # Errors
    /// - `Validation` when the draft text is blank or time is malformed.
    pub fn add(&mut self, draft: TodoDraft) -> StoreResult<TodoItem> {
        let draft = draft.normalized()?;
        let item = TodoItem::from_draft(self.fresh_id(), draft, now_millis());
        self.items.insert(0, item.clone());
        Ok(item)
    }

    /// Flips `completed` and returns the new value.
    pub fn toggle(&mut self, id: &str) -> StoreResult<bool> {
        let item = self.get_mut(id)?;
        item.completed = !item.completed;
        Ok(item.completed)
    }

    /// Replaces text/memo/time; id, completion and creation time are kept.
    pub fn update(&mut self, id: &str, draft: TodoDraft) -> StoreResult<()> {
        // Existence is checked first so a stale id reports NotFound even with
        // an invalid draft.
        self.get_mut(id)?;
        let draft = draft.normalized()?;
        self.get_mut(id)?.apply_draft(draft);
        Ok(())
    }

    /// Removes and returns the matching item.
    pub fn remove(&mut self, id: &str) -> StoreResult<TodoItem> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(self.items.remove(position))
    }

    /// Substitutes the whole sequence.
    pub fn replace_all(&mut self, items: Vec<TodoItem>) {
        self.items = items;
    }

    /// Appends items whose id is not present yet, keeping their relative order.
    ///
    /// Returns the number of items actually appended.
    pub fn append_unique(&mut self, items: Vec<TodoItem>) -> usize {
        let mut known: HashSet<TodoId> = self.items.iter().map(|item| item.id.clone()).collect();
        let before = self.items.len();
        for item in items {
            if known.insert(item.id.clone()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    pub fn get(&self, id: &str) -> Option<&TodoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<TodoItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.completed).count()
    }

    fn get_mut(&mut self, id: &str) -> StoreResult<&mut TodoItem> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn fresh_id(&self) -> TodoId {
        loop {
            let candidate = Uuid::new_v4().to_string();
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }
}
