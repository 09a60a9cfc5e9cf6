//! Import reconciliation.
//!
//! # Invariants
//! - `Overwrite` returns the imported items verbatim.
//! - `Merge` keeps current items first, then appends imports with new ids in
//!   their original relative order.
//! - Choosing the mode is caller policy; nothing here asks the user.

use crate::model::todo::TodoItem;
use crate::repo::item_store::ItemStore;

/// How an imported item list is combined with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Overwrite,
    Merge,
}

/// Result of combining current and imported items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub items: Vec<TodoItem>,
    /// Imported items that made it into `items`.
    pub inserted: usize,
}

pub fn reconcile(current: &[TodoItem], imported: Vec<TodoItem>, mode: ImportMode) -> Reconciliation {
    match mode {
        ImportMode::Overwrite => Reconciliation {
            inserted: imported.len(),
            items: imported,
        },
        ImportMode::Merge => {
            let mut merged = ItemStore::from_items(current.to_vec());
            let inserted = merged.append_unique(imported);
            Reconciliation {
                items: merged.into_items(),
                inserted,
            }
        }
    }
}
