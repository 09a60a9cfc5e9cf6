//! Item ownership and snapshot persistence.
//!
//! # Responsibility
//! - Own the in-memory ordered item collection (`item_store`).
//! - Define the persistence adapter contract and its backends
//!   (`snapshot_repo`).
//!
//! # Invariants
//! - Only the session controller mutates an `ItemStore`.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to DB transport errors.

pub mod item_store;
pub mod snapshot_repo;
