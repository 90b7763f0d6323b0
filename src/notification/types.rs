use serde::Serialize;
use uuid::Uuid;

use crate::document::{ChangeKind, Collection};
use crate::push::PushMessage;
use crate::rules::{NotificationContent, NotificationKind};
use crate::store::NewNotification;

/// Decision produced by a matching rule, before delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationIntent {
    pub kind: NotificationKind,
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl NotificationIntent {
    pub fn new(
        kind: NotificationKind,
        recipient_id: impl Into<String>,
        content: NotificationContent,
    ) -> Self {
        Self {
            kind,
            recipient_id: recipient_id.into(),
            title: content.title,
            body: content.body,
            icon: content.icon,
        }
    }

    /// Push message addressed to the given device token
    pub fn push_message(&self, token: impl Into<String>) -> PushMessage {
        PushMessage {
            token: token.into(),
            title: self.title.clone(),
            body: self.body.clone(),
            icon: self.icon.clone(),
        }
    }

    /// Record to append to the notification store
    pub fn record(&self) -> NewNotification {
        NewNotification {
            user_id: self.recipient_id.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            icon: self.icon.clone(),
        }
    }
}

/// Outcome of the push half of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    Sent,
    /// Recipient has no device token on file
    Skipped,
    Failed,
}

impl PushOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushOutcome::Sent => "sent",
            PushOutcome::Skipped => "skipped",
            PushOutcome::Failed => "failed",
        }
    }
}

/// Result of delivering one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub push: PushOutcome,
    /// Id of the persisted record, `None` when the write failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
}

impl DeliveryOutcome {
    pub fn persisted(&self) -> bool {
        self.record_id.is_some()
    }
}

/// Summary of handling one change event
#[derive(Debug, Clone, Serialize)]
pub struct HandleReport {
    pub document_id: String,
    pub collection: Collection,
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<NotificationIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryOutcome>,
}

impl HandleReport {
    pub fn matched(&self) -> bool {
        self.intent.is_some()
    }
}
