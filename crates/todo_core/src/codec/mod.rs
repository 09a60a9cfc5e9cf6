//! Import/export interchange format.
//!
//! # Responsibility
//! - Encode snapshots as versioned JSON export documents.
//! - Parse and validate user-supplied documents into item lists.
//!
//! # See also
//! - `service::reconcile` for how validated imports are applied.

pub mod document;
