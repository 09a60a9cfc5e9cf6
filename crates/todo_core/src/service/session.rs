//! Session controller: intent handling and side-effect ordering.
//!
//! # Responsibility
//! - Apply user intents to the item store through an explicit state machine.
//! - Persist, auto-backup and re-render after every mutation, in that order.
//! - Route delete and merge decisions through the confirmation prompt.
//!
//! # Invariants
//! - One intent is processed to completion before the next one.
//! - The edit cursor always references an existing item.
//! - While a confirmation is pending, only `Intent::Confirm` is accepted.
//! - Failures never panic; they are returned and, where user-visible,
//!   notified through the renderer.

use crate::codec::document::{parse, BackupKind, ExportFile, ImportError, ValidatedImport};
use crate::model::snapshot::Snapshot;
use crate::model::todo::{now_millis, TodoDraft, TodoId, TodoValidationError};
use crate::repo::item_store::{ItemStore, StoreError, StoreResult};
use crate::repo::snapshot_repo::{RepoError, SnapshotRepository};
use crate::service::export_sink::ExportSink;
use crate::service::ports::{ConfirmPrompt, ConfirmRequest, Notification, Renderer};
use crate::service::reconcile::{reconcile, ImportMode};
use crate::view::projector::{project, ProjectionOptions, TimeLocale, ViewModel};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub type SessionResult<T> = Result<T, SessionError>;

/// Edit-mode state of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Normal,
    Editing(TodoId),
}

impl SessionState {
    /// Id of the item being edited, if any.
    pub fn edit_cursor(&self) -> Option<&str> {
        match self {
            Self::Normal => None,
            Self::Editing(id) => Some(id.as_str()),
        }
    }
}

/// One file handed over by the input surface for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// File decoded as UTF-8 text.
    Loaded { name: String, text: String },
    /// File could not be read.
    Unreadable { name: String, reason: String },
}

/// Closed set of user intents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Add(TodoDraft),
    Toggle(TodoId),
    StartEdit(TodoId),
    SaveEdit(TodoId, TodoDraft),
    CancelEdit,
    Delete(TodoId),
    Export,
    /// Only the first source is used.
    Import(Vec<ImportSource>),
    ToggleTheme,
    ToggleAutoBackup,
    /// Answer to the last `ConfirmRequest`.
    Confirm(bool),
}

/// Session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Ask the prompt before deleting an item.
    pub confirm_deletes: bool,
    pub time_locale: TimeLocale,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confirm_deletes: true,
            time_locale: TimeLocale::default(),
        }
    }
}

/// Collaborators injected into a session.
pub struct Collaborators<R: SnapshotRepository> {
    pub repo: R,
    pub exporter: Box<dyn ExportSink>,
    pub renderer: Box<dyn Renderer>,
    pub prompt: Box<dyn ConfirmPrompt>,
}

/// Errors returned by intent handling.
#[derive(Debug)]
pub enum SessionError {
    /// Add/save input rejected; nothing changed.
    Validation(TodoValidationError),
    /// Import document rejected; store untouched.
    Import(ImportError),
    /// Import file could not be read; store untouched.
    Unreadable { name: String, reason: String },
    /// Snapshot save/load failed.
    Persistence(RepoError),
    /// Export document could not be encoded.
    Encode(serde_json::Error),
    /// Export sink failed.
    Export(io::Error),
    /// A confirmation is pending; the intent was rejected.
    AwaitingConfirmation,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Unreadable { name, reason } => {
                write!(f, "could not read `{name}`: {reason}")
            }
            Self::Persistence(err) => write!(f, "failed to save todos: {err}"),
            Self::Encode(err) => write!(f, "failed to encode export: {err}"),
            Self::Export(err) => write!(f, "failed to write export: {err}"),
            Self::AwaitingConfirmation => write!(f, "waiting for a confirmation answer"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Import(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Export(err) => Some(err),
            Self::Unreadable { .. } | Self::AwaitingConfirmation => None,
        }
    }
}

impl From<TodoValidationError> for SessionError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ImportError> for SessionError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Persistence(value)
    }
}

#[derive(Debug)]
enum PendingConfirmation {
    Delete(TodoId),
    Import(ValidatedImport),
}

/// One user session over a todo list.
pub struct Session<R: SnapshotRepository> {
    store: ItemStore,
    state: SessionState,
    pending: Option<PendingConfirmation>,
    is_dark_mode: bool,
    auto_backup_enabled: bool,
    config: SessionConfig,
    repo: R,
    exporter: Box<dyn ExportSink>,
    renderer: Box<dyn Renderer>,
    prompt: Box<dyn ConfirmPrompt>,
}

impl<R: SnapshotRepository> Session<R> {
    /// Loads the last snapshot (defaults when none) and renders once.
    ///
    /// # Errors
    /// - `Persistence` when the stored snapshot cannot be read.
    pub fn open(collaborators: Collaborators<R>, config: SessionConfig) -> SessionResult<Self> {
        let Collaborators {
            repo,
            exporter,
            renderer,
            prompt,
        } = collaborators;

        let snapshot = repo.load()?.unwrap_or_default();
        info!(
            "event=session_open module=session status=ok items={} dark_mode={} auto_backup={}",
            snapshot.items.len(),
            snapshot.is_dark_mode,
            snapshot.auto_backup_enabled
        );

        let mut session = Self {
            store: ItemStore::from_items(snapshot.items),
            state: SessionState::Normal,
            pending: None,
            is_dark_mode: snapshot.is_dark_mode,
            auto_backup_enabled: snapshot.auto_backup_enabled,
            config,
            repo,
            exporter,
            renderer,
            prompt,
        };
        session.render();
        Ok(session)
    }

    /// Applies one intent.
    pub fn handle(&mut self, intent: Intent) -> SessionResult<()> {
        if self.pending.is_some() && !matches!(intent, Intent::Confirm(_)) {
            warn!("event=intent_rejected module=session status=skip reason=awaiting_confirmation");
            return Err(SessionError::AwaitingConfirmation);
        }

        match intent {
            Intent::Add(draft) => self.add(draft),
            Intent::Toggle(id) => self.toggle(&id),
            Intent::StartEdit(id) => self.start_edit(id),
            Intent::SaveEdit(id, draft) => self.save_edit(&id, draft),
            Intent::CancelEdit => self.cancel_edit(),
            Intent::Delete(id) => self.request_delete(id),
            Intent::Export => self.export(),
            Intent::Import(sources) => self.import(sources),
            Intent::ToggleTheme => self.toggle_theme(),
            Intent::ToggleAutoBackup => self.toggle_auto_backup(),
            Intent::Confirm(answer) => self.confirm(answer),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.pending.is_some()
    }

    /// Current persistable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            items: self.store.items().to_vec(),
            is_dark_mode: self.is_dark_mode,
            auto_backup_enabled: self.auto_backup_enabled,
        }
    }

    /// Projection of the current state.
    pub fn view(&self) -> ViewModel {
        let options = ProjectionOptions {
            is_dark_mode: self.is_dark_mode,
            auto_backup_enabled: self.auto_backup_enabled,
            time_locale: self.config.time_locale,
        };
        project(self.store.items(), self.state.edit_cursor(), &options)
    }

    fn add(&mut self, draft: TodoDraft) -> SessionResult<()> {
        let Some(item) = tolerate_missing(self.store.add(draft), "todo_add")? else {
            return Ok(());
        };
        if let SessionState::Editing(id) = &self.state {
            debug!("event=edit_cancel module=session status=ok reason=add id={id}");
        }
        self.state = SessionState::Normal;
        info!(
            "event=todo_add module=session status=ok id={} total={}",
            item.id,
            self.store.len()
        );
        self.commit(true)
    }

    fn toggle(&mut self, id: &str) -> SessionResult<()> {
        let Some(completed) = tolerate_missing(self.store.toggle(id), "todo_toggle")? else {
            return Ok(());
        };
        info!("event=todo_toggle module=session status=ok id={id} completed={completed}");
        self.commit(true)
    }

    fn start_edit(&mut self, id: TodoId) -> SessionResult<()> {
        if !self.store.contains(&id) {
            debug!("event=edit_start module=session status=skip reason=not_found id={id}");
            return Ok(());
        }
        debug!("event=edit_start module=session status=ok id={id}");
        self.state = SessionState::Editing(id);
        self.render();
        Ok(())
    }

    fn save_edit(&mut self, id: &str, draft: TodoDraft) -> SessionResult<()> {
        if self.state.edit_cursor() != Some(id) {
            debug!("event=edit_save module=session status=skip reason=not_editing id={id}");
            return Ok(());
        }
        if tolerate_missing(self.store.update(id, draft), "edit_save")?.is_none() {
            self.state = SessionState::Normal;
            self.render();
            return Ok(());
        }
        self.state = SessionState::Normal;
        info!("event=edit_save module=session status=ok id={id}");
        self.commit(true)
    }

    fn cancel_edit(&mut self) -> SessionResult<()> {
        self.state = SessionState::Normal;
        self.render();
        Ok(())
    }

    fn request_delete(&mut self, id: TodoId) -> SessionResult<()> {
        if !self.store.contains(&id) {
            debug!("event=todo_delete module=session status=skip reason=not_found id={id}");
            return Ok(());
        }
        if !self.config.confirm_deletes {
            return self.delete(&id);
        }
        self.pending = Some(PendingConfirmation::Delete(id.clone()));
        self.prompt.request(ConfirmRequest::Delete { id });
        Ok(())
    }

    fn delete(&mut self, id: &str) -> SessionResult<()> {
        if tolerate_missing(self.store.remove(id), "todo_delete")?.is_none() {
            return Ok(());
        }
        if self.state.edit_cursor() == Some(id) {
            self.state = SessionState::Normal;
        }
        info!(
            "event=todo_delete module=session status=ok id={id} total={}",
            self.store.len()
        );
        self.commit(true)
    }

    fn confirm(&mut self, answer: bool) -> SessionResult<()> {
        match self.pending.take() {
            None => {
                debug!("event=confirm module=session status=skip reason=nothing_pending");
                Ok(())
            }
            Some(PendingConfirmation::Delete(id)) if answer => self.delete(&id),
            Some(PendingConfirmation::Delete(id)) => {
                debug!("event=todo_delete module=session status=skip reason=declined id={id}");
                Ok(())
            }
            Some(PendingConfirmation::Import(validated)) => {
                let mode = if answer {
                    ImportMode::Merge
                } else {
                    ImportMode::Overwrite
                };
                self.apply_import(validated, mode)
            }
        }
    }

    fn import(&mut self, sources: Vec<ImportSource>) -> SessionResult<()> {
        let Some(source) = sources.into_iter().next() else {
            return Ok(());
        };

        let text = match source {
            ImportSource::Loaded { text, .. } => text,
            ImportSource::Unreadable { name, reason } => {
                error!("event=import module=session status=error error_code=unreadable");
                self.renderer
                    .notify(Notification::error(format!("Could not read file `{name}`.")));
                return Err(SessionError::Unreadable { name, reason });
            }
        };

        let validated = match parse(&text, now_millis()) {
            Ok(validated) => validated,
            Err(err) => {
                error!("event=import module=session status=error error={err}");
                self.renderer
                    .notify(Notification::error(format!("Import failed: {err}")));
                return Err(err.into());
            }
        };

        if self.store.is_empty() {
            return self.apply_import(validated, ImportMode::Overwrite);
        }

        let request = ConfirmRequest::MergeImport {
            existing: self.store.len(),
            incoming: validated.items.len(),
        };
        self.pending = Some(PendingConfirmation::Import(validated));
        self.prompt.request(request);
        Ok(())
    }

    fn apply_import(&mut self, validated: ValidatedImport, mode: ImportMode) -> SessionResult<()> {
        let result = reconcile(self.store.items(), validated.items, mode);
        self.store.replace_all(result.items);

        if let Some(is_dark_mode) = validated.is_dark_mode {
            self.is_dark_mode = is_dark_mode;
        }
        if let Some(auto_backup_enabled) = validated.auto_backup_enabled {
            self.auto_backup_enabled = auto_backup_enabled;
        }
        let cursor_lost = self
            .state
            .edit_cursor()
            .is_some_and(|id| !self.store.contains(id));
        if cursor_lost {
            self.state = SessionState::Normal;
        }

        info!(
            "event=import module=session status=ok mode={:?} inserted={} total={}",
            mode,
            result.inserted,
            self.store.len()
        );
        let message = match mode {
            ImportMode::Merge => format!("Added {} new todos.", result.inserted),
            ImportMode::Overwrite => format!("Loaded {} todos.", result.inserted),
        };
        self.renderer.notify(Notification::success(message));
        self.commit(true)
    }

    fn export(&mut self) -> SessionResult<()> {
        let outcome = self.write_export(BackupKind::Manual);
        match &outcome {
            Ok(file_name) => self.renderer.notify(Notification::success(format!(
                "Exported {} todos to {file_name}.",
                self.store.len()
            ))),
            Err(err) => self
                .renderer
                .notify(Notification::error(format!("Export failed: {err}"))),
        }
        outcome.map(|_| ())
    }

    fn toggle_theme(&mut self) -> SessionResult<()> {
        self.is_dark_mode = !self.is_dark_mode;
        debug!(
            "event=theme_toggle module=session status=ok dark_mode={}",
            self.is_dark_mode
        );
        self.commit(false)
    }

    fn toggle_auto_backup(&mut self) -> SessionResult<()> {
        self.auto_backup_enabled = !self.auto_backup_enabled;
        info!(
            "event=auto_backup_toggle module=session status=ok enabled={}",
            self.auto_backup_enabled
        );
        let notification = if self.auto_backup_enabled {
            Notification::success("Auto backup is on. Every change is exported automatically.")
        } else {
            Notification::info("Auto backup is off.")
        };
        self.renderer.notify(notification);
        self.commit(false)
    }

    /// Save, optionally auto-backup, then render. Rendering always happens;
    /// the first failure is returned.
    fn commit(&mut self, items_changed: bool) -> SessionResult<()> {
        let saved = self.persist();
        let backed_up = if items_changed {
            self.auto_backup()
        } else {
            Ok(())
        };
        self.render();
        saved.and(backed_up)
    }

    fn persist(&mut self) -> SessionResult<()> {
        if let Err(err) = self.repo.save(&self.snapshot()) {
            error!("event=snapshot_save module=session status=error error={err}");
            self.renderer
                .notify(Notification::error(format!("Could not save todos: {err}")));
            return Err(err.into());
        }
        Ok(())
    }

    fn auto_backup(&mut self) -> SessionResult<()> {
        if !self.auto_backup_enabled || self.store.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.write_export(BackupKind::Automatic) {
            error!("event=auto_backup module=session status=error error={err}");
            self.renderer
                .notify(Notification::error(format!("Auto backup failed: {err}")));
            return Err(err);
        }
        Ok(())
    }

    fn write_export(&mut self, kind: BackupKind) -> SessionResult<String> {
        let file =
            ExportFile::build(&self.snapshot(), kind, now_millis()).map_err(SessionError::Encode)?;
        self.exporter.write(&file).map_err(SessionError::Export)?;
        info!(
            "event=export module=session status=ok kind={:?} items={}",
            kind,
            self.store.len()
        );
        Ok(file.file_name)
    }

    fn render(&mut self) {
        let view = self.view();
        self.renderer.render(&view);
    }
}

/// Turns `NotFound` into a logged no-op; validation errors pass through.
fn tolerate_missing<T>(result: StoreResult<T>, event: &str) -> SessionResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound(id)) => {
            debug!("event={event} module=session status=skip reason=not_found id={id}");
            Ok(None)
        }
        Err(StoreError::Validation(err)) => {
            debug!("event={event} module=session status=skip reason=validation error={err}");
            Err(err.into())
        }
    }
}
