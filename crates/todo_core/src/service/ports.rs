//! Collaborator contracts the session controller talks to.
//!
//! # Responsibility
//! - Describe the renderer (view-model + notification sink).
//! - Describe the yes/no prompt used for delete and merge confirmation.
//!
//! # Invariants
//! - Prompts never block; answers arrive later as `Intent::Confirm`.

use crate::model::todo::TodoId;
use crate::view::projector::ViewModel;

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

/// Short user-facing message raised alongside a view update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }
}

/// Receives view-models and notifications.
pub trait Renderer {
    fn render(&mut self, view: &ViewModel);
    fn notify(&mut self, notification: Notification);
}

/// Question the controller needs answered before continuing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmRequest {
    /// Delete the item with this id?
    Delete { id: TodoId },
    /// Merge `incoming` imported items into `existing` ones?
    /// Declining replaces the current list.
    MergeImport { existing: usize, incoming: usize },
}

/// Asynchronous yes/no prompt offered by the input surface.
pub trait ConfirmPrompt {
    fn request(&mut self, request: ConfirmRequest);
}
