//! Core domain logic for the todo list.
//! This crate is the single source of truth for item invariants, import
//! reconciliation and view projection.

pub mod codec;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod view;

pub use codec::document::{
    export_file_name, parse, serialize, to_json, BackupKind, ExportDocument, ExportFile,
    ImportError, ValidatedImport, DOCUMENT_VERSION,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::snapshot::Snapshot;
pub use model::todo::{TodoDraft, TodoId, TodoItem, TodoValidationError};
pub use repo::item_store::{ItemStore, StoreError, StoreResult};
pub use repo::snapshot_repo::{
    MemorySnapshotRepository, RepoError, RepoResult, SnapshotRepository,
    SqliteSnapshotRepository,
};
pub use service::export_sink::{DirectoryExportSink, ExportSink, MemoryExportSink};
pub use service::ports::{
    ConfirmPrompt, ConfirmRequest, Notification, NotificationLevel, Renderer,
};
pub use service::reconcile::{reconcile, ImportMode, Reconciliation};
pub use service::session::{
    Collaborators, ImportSource, Intent, Session, SessionConfig, SessionError, SessionResult,
    SessionState,
};
pub use view::projector::{
    format_time, parse_row_action, project, ProjectionOptions, RowAction, RowView, Theme,
    TimeLocale, ViewModel,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
