use serde_json::json;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use todo_core::{
    Collaborators, ConfirmPrompt, ConfirmRequest, ExportFile, ExportSink, ImportError,
    ImportSource, Intent, MemoryExportSink, MemorySnapshotRepository, Notification,
    NotificationLevel, RepoResult, Renderer, Session, SessionConfig, SessionError, SessionState,
    Snapshot, SnapshotRepository, TodoDraft, TodoValidationError, ViewModel,
};

#[derive(Default)]
struct Recorded {
    views: Vec<ViewModel>,
    notifications: Vec<Notification>,
    prompts: Vec<ConfirmRequest>,
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Recorded>>);

impl Recorder {
    fn last_view(&self) -> ViewModel {
        self.0.borrow().views.last().cloned().expect("at least one render")
    }

    fn render_count(&self) -> usize {
        self.0.borrow().views.len()
    }

    fn notifications(&self) -> Vec<Notification> {
        self.0.borrow().notifications.clone()
    }

    fn prompts(&self) -> Vec<ConfirmRequest> {
        self.0.borrow().prompts.clone()
    }
}

impl Renderer for Recorder {
    fn render(&mut self, view: &ViewModel) {
        self.0.borrow_mut().views.push(view.clone());
    }

    fn notify(&mut self, notification: Notification) {
        self.0.borrow_mut().notifications.push(notification);
    }
}

impl ConfirmPrompt for Recorder {
    fn request(&mut self, request: ConfirmRequest) {
        self.0.borrow_mut().prompts.push(request);
    }
}

struct FailingSink;

impl ExportSink for FailingSink {
    fn write(&mut self, _file: &ExportFile) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

struct Harness {
    session: Session<MemorySnapshotRepository>,
    repo: MemorySnapshotRepository,
    exports: MemoryExportSink,
    ui: Recorder,
}

fn open_with(snapshot: Option<Snapshot>, config: SessionConfig) -> Harness {
    let repo = match snapshot {
        Some(snapshot) => MemorySnapshotRepository::with_snapshot(snapshot),
        None => MemorySnapshotRepository::new(),
    };
    let exports = MemoryExportSink::new();
    let ui = Recorder::default();
    let session = Session::open(
        Collaborators {
            repo: repo.clone(),
            exporter: Box::new(exports.clone()),
            renderer: Box::new(ui.clone()),
            prompt: Box::new(ui.clone()),
        },
        config,
    )
    .unwrap();
    Harness {
        session,
        repo,
        exports,
        ui,
    }
}

fn open() -> Harness {
    open_with(None, SessionConfig::default())
}

fn open_without_delete_prompt() -> Harness {
    open_with(
        None,
        SessionConfig {
            confirm_deletes: false,
            ..SessionConfig::default()
        },
    )
}

fn add(harness: &mut Harness, text: &str) -> String {
    harness
        .session
        .handle(Intent::Add(TodoDraft::text(text)))
        .unwrap();
    harness.session.store().items()[0].id.clone()
}

fn import_text(text: String) -> Intent {
    Intent::Import(vec![ImportSource::Loaded {
        name: "backup.json".to_string(),
        text,
    }])
}

#[test]
fn open_renders_stored_snapshot() {
    let mut seeded = open();
    add(&mut seeded, "persisted");
    let snapshot = seeded.repo.load().unwrap().unwrap();

    let harness = open_with(Some(snapshot), SessionConfig::default());
    let view = harness.ui.last_view();
    assert_eq!(view.total_count, 1);
    assert_eq!(view.rows[0].text, "persisted");
}

#[test]
fn add_renders_new_item_first_and_persists() {
    let mut harness = open();
    add(&mut harness, "older");
    let id = add(&mut harness, "newer");

    let view = harness.ui.last_view();
    assert_eq!(view.total_count, 2);
    assert_eq!(view.rows[0].id, id);
    let saved = harness.repo.load().unwrap().unwrap();
    assert_eq!(saved.items.len(), 2);
}

#[test]
fn whitespace_add_is_a_silent_no_op() {
    let mut harness = open();
    let renders = harness.ui.render_count();

    let err = harness
        .session
        .handle(Intent::Add(TodoDraft::text("   ")))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(TodoValidationError::EmptyText)
    ));
    assert_eq!(harness.session.view().total_count, 0);
    assert_eq!(harness.ui.render_count(), renders);
    assert!(harness.ui.notifications().is_empty());
    assert_eq!(harness.repo.load().unwrap(), None);
}

#[test]
fn toggle_unknown_id_is_benign() {
    let mut harness = open();
    harness
        .session
        .handle(Intent::Toggle("ghost".to_string()))
        .unwrap();
    assert!(harness.ui.notifications().is_empty());
}

#[test]
fn edit_save_and_cancel_transitions() {
    let mut harness = open();
    let id = add(&mut harness, "draft");

    harness
        .session
        .handle(Intent::StartEdit(id.clone()))
        .unwrap();
    assert_eq!(harness.session.state(), &SessionState::Editing(id.clone()));
    assert!(harness.ui.last_view().rows[0].editing);

    let err = harness
        .session
        .handle(Intent::SaveEdit(id.clone(), TodoDraft::text(" ")))
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert_eq!(harness.session.state(), &SessionState::Editing(id.clone()));

    harness
        .session
        .handle(Intent::SaveEdit(
            id.clone(),
            TodoDraft::new("final", "memo", "09:00"),
        ))
        .unwrap();
    assert_eq!(harness.session.state(), &SessionState::Normal);
    let row = &harness.ui.last_view().rows[0];
    assert_eq!(row.text, "final");
    assert_eq!(row.time_label.as_deref(), Some("9:00 AM"));

    harness
        .session
        .handle(Intent::StartEdit(id.clone()))
        .unwrap();
    harness.session.handle(Intent::CancelEdit).unwrap();
    assert_eq!(harness.session.state(), &SessionState::Normal);
    assert_eq!(harness.session.store().get(&id).unwrap().text, "final");
}

#[test]
fn start_edit_on_missing_id_stays_normal() {
    let mut harness = open();
    harness
        .session
        .handle(Intent::StartEdit("ghost".to_string()))
        .unwrap();
    assert_eq!(harness.session.state(), &SessionState::Normal);
}

#[test]
fn add_while_editing_cancels_the_edit() {
    let mut harness = open();
    let id = add(&mut harness, "being edited");
    harness.session.handle(Intent::StartEdit(id)).unwrap();

    add(&mut harness, "interrupting");
    assert_eq!(harness.session.state(), &SessionState::Normal);
}

#[test]
fn deleting_the_edited_item_returns_to_normal() {
    let mut harness = open_without_delete_prompt();
    let id = add(&mut harness, "doomed");
    harness
        .session
        .handle(Intent::StartEdit(id.clone()))
        .unwrap();

    harness.session.handle(Intent::Delete(id)).unwrap();
    assert_eq!(harness.session.state(), &SessionState::Normal);
    assert!(harness.ui.last_view().is_empty);
}

#[test]
fn deleting_another_item_keeps_editing() {
    let mut harness = open_without_delete_prompt();
    let other = add(&mut harness, "other");
    let edited = add(&mut harness, "edited");
    harness
        .session
        .handle(Intent::StartEdit(edited.clone()))
        .unwrap();

    harness.session.handle(Intent::Delete(other)).unwrap();
    assert_eq!(harness.session.state(), &SessionState::Editing(edited));
    assert_eq!(harness.session.store().len(), 1);
}

#[test]
fn delete_waits_for_confirmation() {
    let mut harness = open();
    let id = add(&mut harness, "maybe");

    harness.session.handle(Intent::Delete(id.clone())).unwrap();
    assert_eq!(
        harness.ui.prompts(),
        vec![ConfirmRequest::Delete { id: id.clone() }]
    );
    assert!(harness.session.is_awaiting_confirmation());
    assert!(matches!(
        harness.session.handle(Intent::Toggle(id.clone())),
        Err(SessionError::AwaitingConfirmation)
    ));

    harness.session.handle(Intent::Confirm(false)).unwrap();
    assert_eq!(harness.session.store().len(), 1);

    harness.session.handle(Intent::Delete(id)).unwrap();
    harness.session.handle(Intent::Confirm(true)).unwrap();
    assert!(harness.session.store().is_empty());
    assert!(!harness.session.is_awaiting_confirmation());
}

#[test]
fn confirm_without_pending_question_is_ignored() {
    let mut harness = open();
    harness.session.handle(Intent::Confirm(true)).unwrap();
    assert!(harness.session.store().is_empty());
}

#[test]
fn import_into_empty_store_overwrites_and_applies_flags() {
    let mut harness = open();
    let text = json!({
        "todos": [{ "id": "1", "text": "A" }, { "id": "2", "text": "B", "completed": true }],
        "isDarkMode": true
    })
    .to_string();

    harness.session.handle(import_text(text)).unwrap();

    assert!(harness.ui.prompts().is_empty());
    let view = harness.ui.last_view();
    assert_eq!(view.total_count, 2);
    assert_eq!(view.completed_count, 1);
    assert_eq!(view.theme, todo_core::Theme::Dark);
    let last = harness.ui.notifications().pop().unwrap();
    assert_eq!(last.level, NotificationLevel::Success);
    assert!(harness.repo.load().unwrap().unwrap().is_dark_mode);
}

#[test]
fn import_into_non_empty_store_merges_on_yes() {
    let mut harness = open();
    let existing = add(&mut harness, "A");
    let text = json!({ "todos": [{ "id": existing, "text": "dup" }, { "id": "2", "text": "B" }] })
        .to_string();

    harness.session.handle(import_text(text)).unwrap();
    assert_eq!(
        harness.ui.prompts(),
        vec![ConfirmRequest::MergeImport {
            existing: 1,
            incoming: 2
        }]
    );
    assert_eq!(harness.session.store().len(), 1);

    harness.session.handle(Intent::Confirm(true)).unwrap();
    let items = harness.session.store().items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text, "A");
    assert_eq!(items[1].id, "2");
    assert_eq!(items[1].memo, "");
    assert!(harness
        .ui
        .notifications()
        .iter()
        .any(|n| n.message.contains("Added 1")));
}

#[test]
fn import_into_non_empty_store_overwrites_on_no() {
    let mut harness = open();
    let id = add(&mut harness, "old");
    harness.session.handle(Intent::StartEdit(id)).unwrap();
    let text = json!({ "todos": [{ "id": "x", "text": "fresh" }] }).to_string();

    harness.session.handle(import_text(text)).unwrap();
    harness.session.handle(Intent::Confirm(false)).unwrap();

    let items = harness.session.store().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "x");
    assert_eq!(harness.session.state(), &SessionState::Normal);
}

#[test]
fn import_missing_todos_leaves_store_untouched() {
    let mut harness = open();
    add(&mut harness, "keep me");
    let before = harness.session.snapshot();

    let err = harness
        .session
        .handle(import_text(json!({ "isDarkMode": true }).to_string()))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Import(ImportError::MissingField("todos"))
    ));
    assert_eq!(harness.session.snapshot(), before);
    let last = harness.ui.notifications().pop().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
}

#[test]
fn unreadable_import_is_reported_and_ignored() {
    let mut harness = open();
    let err = harness
        .session
        .handle(Intent::Import(vec![ImportSource::Unreadable {
            name: "broken.json".to_string(),
            reason: "permission denied".to_string(),
        }]))
        .unwrap_err();
    assert!(matches!(err, SessionError::Unreadable { .. }));
    assert!(harness.session.store().is_empty());
}

#[test]
fn import_uses_only_the_first_file() {
    let mut harness = open();
    harness
        .session
        .handle(Intent::Import(vec![
            ImportSource::Loaded {
                name: "a.json".to_string(),
                text: json!({ "todos": [{ "id": "a", "text": "A" }] }).to_string(),
            },
            ImportSource::Loaded {
                name: "b.json".to_string(),
                text: "garbage".to_string(),
            },
        ]))
        .unwrap();
    assert_eq!(harness.session.store().len(), 1);

    harness.session.handle(Intent::Import(Vec::new())).unwrap();
    assert_eq!(harness.session.store().len(), 1);
}

#[test]
fn manual_export_writes_backup_file() {
    let mut harness = open();
    add(&mut harness, "exported");

    harness.session.handle(Intent::Export).unwrap();
    let files = harness.exports.files();
    assert_eq!(files.len(), 1);
    assert!(files[0].file_name.starts_with("todo-backup-"));
    let document: serde_json::Value = serde_json::from_str(&files[0].contents).unwrap();
    assert_eq!(document["todos"][0]["text"], "exported");
    assert!(document.get("autoBackup").is_none());
}

#[test]
fn failing_export_sink_is_surfaced() {
    let ui = Recorder::default();
    let mut session = Session::open(
        Collaborators {
            repo: MemorySnapshotRepository::new(),
            exporter: Box::new(FailingSink),
            renderer: Box::new(ui.clone()),
            prompt: Box::new(ui.clone()),
        },
        SessionConfig::default(),
    )
    .unwrap();

    let err = session.handle(Intent::Export).unwrap_err();
    assert!(matches!(err, SessionError::Export(_)));
    assert_eq!(
        ui.notifications().pop().unwrap().level,
        NotificationLevel::Error
    );
}

#[test]
fn auto_backup_exports_after_item_mutations_only() {
    let mut harness = open();
    harness.session.handle(Intent::ToggleAutoBackup).unwrap();
    assert!(harness.ui.last_view().auto_backup_enabled);
    assert!(harness.exports.files().is_empty());

    let id = add(&mut harness, "tracked");
    harness.session.handle(Intent::Toggle(id)).unwrap();
    harness.session.handle(Intent::ToggleTheme).unwrap();

    let files = harness.exports.files();
    assert_eq!(files.len(), 2);
    assert!(files
        .iter()
        .all(|file| file.file_name.starts_with("todo-auto-backup-")));
    let document: serde_json::Value = serde_json::from_str(&files[1].contents).unwrap();
    assert_eq!(document["autoBackup"], true);
    assert_eq!(document["todos"][0]["completed"], true);
}

#[test]
fn auto_backup_skips_empty_list() {
    let mut harness = open_without_delete_prompt();
    let id = add(&mut harness, "short lived");
    harness.session.handle(Intent::ToggleAutoBackup).unwrap();

    harness.session.handle(Intent::Delete(id)).unwrap();
    assert!(harness.exports.files().is_empty());
}

#[test]
fn theme_toggle_persists_and_renders() {
    let mut harness = open();
    harness.session.handle(Intent::ToggleTheme).unwrap();
    assert_eq!(harness.ui.last_view().theme, todo_core::Theme::Dark);
    assert!(harness.repo.load().unwrap().unwrap().is_dark_mode);
}

struct BrokenRepo;

impl SnapshotRepository for BrokenRepo {
    fn save(&self, _snapshot: &Snapshot) -> RepoResult<()> {
        Err(todo_core::RepoError::InvalidData("disk full".to_string()))
    }

    fn load(&self) -> RepoResult<Option<Snapshot>> {
        Ok(None)
    }
}

#[test]
fn persistence_failure_keeps_change_in_memory_and_notifies() {
    let ui = Recorder::default();
    let mut session = Session::open(
        Collaborators {
            repo: BrokenRepo,
            exporter: Box::new(MemoryExportSink::new()),
            renderer: Box::new(ui.clone()),
            prompt: Box::new(ui.clone()),
        },
        SessionConfig::default(),
    )
    .unwrap();

    let err = session
        .handle(Intent::Add(TodoDraft::text("unsaved")))
        .unwrap_err();
    assert!(matches!(err, SessionError::Persistence(_)));
    assert_eq!(ui.last_view().total_count, 1);
    assert_eq!(
        ui.notifications().pop().unwrap().level,
        NotificationLevel::Error
    );
}
