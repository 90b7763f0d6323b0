//! Document lifecycle events delivered by the change feed.
//!
//! A [`ChangeEvent`] is the wire format shared by every trigger (HTTP webhook,
//! Redis Pub/Sub). It carries raw JSON snapshots; [`DocumentChange::decode`]
//! turns it into typed snapshots the rule table can match on.

mod models;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use models::{
    ExchangeRequest, Message, RequestedBook, CONFIRMATION_CANCELLED, CONFIRMATION_CONFIRMED,
    DEFAULT_BOOK_TITLE, STATUS_AWAITING_ADDRESS, STATUS_AWAITING_RECEIPT,
    STATUS_FINISHED_PREFIX, STATUS_FINISHED_WITH_DIVERGENCE, STATUS_PENDING,
};

/// Collections the notifier subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Messages,
    Requests,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Messages => "messages",
            Collection::Requests => "requests",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage reported by the change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change-feed event as received from a trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub document_id: String,
    pub kind: ChangeKind,
    /// Snapshot before the change (updates and deletes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    /// Snapshot after the change (creates and updates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl ChangeEvent {
    pub fn created(collection: Collection, document_id: impl Into<String>, after: Value) -> Self {
        Self {
            collection,
            document_id: document_id.into(),
            kind: ChangeKind::Created,
            before: None,
            after: Some(after),
        }
    }

    pub fn updated(
        collection: Collection,
        document_id: impl Into<String>,
        before: Value,
        after: Value,
    ) -> Self {
        Self {
            collection,
            document_id: document_id.into(),
            kind: ChangeKind::Updated,
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(collection: Collection, document_id: impl Into<String>, before: Value) -> Self {
        Self {
            collection,
            document_id: document_id.into(),
            kind: ChangeKind::Deleted,
            before: Some(before),
            after: None,
        }
    }
}

/// Errors raised while decoding a change event
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{kind} event on {collection} is missing the '{side}' snapshot")]
    MissingSnapshot {
        collection: Collection,
        kind: ChangeKind,
        side: &'static str,
    },

    #[error("{kind} event on {collection} has a non-object '{side}' snapshot")]
    NotAnObject {
        collection: Collection,
        kind: ChangeKind,
        side: &'static str,
    },

    #[error("invalid {collection} snapshot: {source}")]
    InvalidSnapshot {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
}

/// Trigger a rule is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    MessageCreated,
    RequestCreated,
    RequestUpdated,
    RequestDeleted,
}

/// Typed view of a change event
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentChange {
    MessageCreated(Message),
    RequestCreated(ExchangeRequest),
    RequestUpdated {
        before: ExchangeRequest,
        after: ExchangeRequest,
    },
    /// Carries the snapshot captured at the moment of deletion
    RequestDeleted(ExchangeRequest),
    /// A lifecycle stage no rule listens to (message updates and deletes)
    Unobserved {
        collection: Collection,
        kind: ChangeKind,
    },
}

impl DocumentChange {
    /// Decode the snapshots an event carries for its collection and kind
    pub fn decode(event: &ChangeEvent) -> Result<Self, DecodeError> {
        let collection = event.collection;
        let kind = event.kind;

        match (collection, kind) {
            (Collection::Messages, ChangeKind::Created) => {
                let after = snapshot(event, "after", event.after.as_ref())?;
                Ok(DocumentChange::MessageCreated(parse(collection, after)?))
            }
            (Collection::Messages, _) => Ok(DocumentChange::Unobserved { collection, kind }),
            (Collection::Requests, ChangeKind::Created) => {
                let after = snapshot(event, "after", event.after.as_ref())?;
                Ok(DocumentChange::RequestCreated(parse(collection, after)?))
            }
            (Collection::Requests, ChangeKind::Updated) => {
                let before = snapshot(event, "before", event.before.as_ref())?;
                let after = snapshot(event, "after", event.after.as_ref())?;
                Ok(DocumentChange::RequestUpdated {
                    before: parse(collection, before)?,
                    after: parse(collection, after)?,
                })
            }
            (Collection::Requests, ChangeKind::Deleted) => {
                let before = snapshot(event, "before", event.before.as_ref())?;
                Ok(DocumentChange::RequestDeleted(parse(collection, before)?))
            }
        }
    }

    pub fn trigger(&self) -> Option<Trigger> {
        match self {
            DocumentChange::MessageCreated(_) => Some(Trigger::MessageCreated),
            DocumentChange::RequestCreated(_) => Some(Trigger::RequestCreated),
            DocumentChange::RequestUpdated { .. } => Some(Trigger::RequestUpdated),
            DocumentChange::RequestDeleted(_) => Some(Trigger::RequestDeleted),
            DocumentChange::Unobserved { .. } => None,
        }
    }
}

fn snapshot<'a>(
    event: &ChangeEvent,
    side: &'static str,
    value: Option<&'a Value>,
) -> Result<&'a Value, DecodeError> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or(DecodeError::MissingSnapshot {
            collection: event.collection,
            kind: event.kind,
            side,
        })?;

    if !value.is_object() {
        return Err(DecodeError::NotAnObject {
            collection: event.collection,
            kind: event.kind,
            side,
        });
    }
    Ok(value)
}

fn parse<T: serde::de::DeserializeOwned>(
    collection: Collection,
    value: &Value,
) -> Result<T, DecodeError> {
    T::deserialize(value).map_err(|source| DecodeError::InvalidSnapshot { collection, source })
}
