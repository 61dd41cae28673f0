use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::client::generate_id;

/// Lifetime of an auto-dismissing notification
pub const AUTO_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NotificationId(String);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub auto_dismiss: bool,
}

/// Ordered list of live notifications, oldest first
#[derive(Debug, Default)]
pub struct NotificationCenter {
    items: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        auto_dismiss: bool,
    ) -> &Notification {
        let notification = Notification {
            id: NotificationId(generate_id()),
            kind,
            title: title.into(),
            message: message.into(),
            auto_dismiss,
        };
        tracing::debug!("Notification {:?}: {}", notification.kind, notification.title);
        self.items.push(notification);
        &self.items[self.items.len() - 1]
    }

    pub fn dismiss(&mut self, id: &NotificationId) -> bool {
        let before = self.items.len();
        self.items.retain(|n| &n.id != id);
        before != self.items.len()
    }

    pub fn list(&self) -> &[Notification] {
        &self.items
    }
}
