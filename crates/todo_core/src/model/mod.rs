//! Domain model for todo items and persisted application state.
//!
//! # Responsibility
//! - Define the canonical item record shared by store, codec and projector.
//! - Define the persisted snapshot shape.
//!
//! # Invariants
//! - Every item is identified by a stable, store-unique `TodoId`.
//! - `id` and `created_at` never change after an item is created.

pub mod snapshot;
pub mod todo;
