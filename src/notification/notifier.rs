use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::document::{ChangeEvent, DecodeError, DocumentChange};
use crate::metrics::{DeliveryMetrics, EventMetrics};
use crate::push::PushSender;
use crate::rules::{ContentContext, RuleMatch, RuleTable, DEFAULT_SENDER_NAME};
use crate::store::{NotificationStore, Stores, UserDirectory, UserProfile};

use super::types::{DeliveryOutcome, HandleReport, NotificationIntent, PushOutcome};

/// Errors that abort handling of a single event
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("malformed change event: {0}")]
    Decode(#[from] DecodeError),
}

/// Statistics for the notifier
#[derive(Debug, Default)]
pub struct NotifierStats {
    pub events_received: AtomicU64,
    pub events_rejected: AtomicU64,
    pub intents: AtomicU64,
    pub push_sent: AtomicU64,
    pub push_skipped: AtomicU64,
    pub push_failed: AtomicU64,
    pub records_persisted: AtomicU64,
    pub records_failed: AtomicU64,
}

impl NotifierStats {
    pub fn snapshot(&self) -> NotifierStatsSnapshot {
        NotifierStatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            intents: self.intents.load(Ordering::Relaxed),
            push_sent: self.push_sent.load(Ordering::Relaxed),
            push_skipped: self.push_skipped.load(Ordering::Relaxed),
            push_failed: self.push_failed.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of notifier statistics
#[derive(Debug, Clone, Serialize)]
pub struct NotifierStatsSnapshot {
    pub events_received: u64,
    pub events_rejected: u64,
    pub intents: u64,
    pub push_sent: u64,
    pub push_skipped: u64,
    pub push_failed: u64,
    pub records_persisted: u64,
    pub records_failed: u64,
}

/// Evaluates change events against the rule table and delivers the resulting
/// notification: a best-effort push plus an unconditional record write.
pub struct TransitionNotifier {
    rules: RuleTable,
    users: Arc<dyn UserDirectory>,
    push: Arc<dyn PushSender>,
    store: Arc<dyn NotificationStore>,
    stats: NotifierStats,
}

impl TransitionNotifier {
    /// Create a notifier with the standard rule table
    pub fn new(stores: Stores, push: Arc<dyn PushSender>) -> Self {
        Self::with_rules(RuleTable::default(), stores, push)
    }

    pub fn with_rules(rules: RuleTable, stores: Stores, push: Arc<dyn PushSender>) -> Self {
        Self {
            rules,
            users: stores.users,
            push,
            store: stores.notifications,
            stats: NotifierStats::default(),
        }
    }

    pub fn stats(&self) -> NotifierStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn users_backend(&self) -> &'static str {
        self.users.backend_name()
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn push_backend(&self) -> &'static str {
        self.push.backend_name()
    }

    /// Handle one change event end to end.
    ///
    /// Only a malformed event is an error; lookup, push and persistence
    /// failures are logged and reflected in the report.
    #[tracing::instrument(
        name = "notifier.handle",
        skip(self, event),
        fields(
            collection = %event.collection,
            kind = %event.kind,
            document_id = %event.document_id
        )
    )]
    pub async fn handle(&self, event: &ChangeEvent) -> Result<HandleReport, NotifierError> {
        let started = Instant::now();
        self.stats.events_received.fetch_add(1, Ordering::Relaxed);
        EventMetrics::record_received(event.collection.as_str(), event.kind.as_str());

        let change = match DocumentChange::decode(event) {
            Ok(change) => change,
            Err(e) => {
                self.stats.events_rejected.fetch_add(1, Ordering::Relaxed);
                EventMetrics::record_rejected();
                tracing::warn!(error = %e, "Rejected malformed change event");
                return Err(e.into());
            }
        };

        let intent = self.intent_for(&change).await;
        let delivery = match &intent {
            Some(intent) => Some(self.deliver(intent).await),
            None => {
                tracing::debug!("No rule matched");
                None
            }
        };

        EventMetrics::record_handling_time(started.elapsed().as_secs_f64());

        Ok(HandleReport {
            document_id: event.document_id.clone(),
            collection: event.collection,
            kind: event.kind,
            intent,
            delivery,
        })
    }

    /// Evaluate the rule table and build the intent for the first match
    pub async fn intent_for(&self, change: &DocumentChange) -> Option<NotificationIntent> {
        let matched = self.rules.evaluate(change)?;
        let intent = self.build_intent(matched).await;

        self.stats.intents.fetch_add(1, Ordering::Relaxed);
        EventMetrics::record_intent(intent.kind.as_str());
        tracing::debug!(
            rule = %intent.kind,
            recipient_id = %intent.recipient_id,
            "Rule matched"
        );

        Some(intent)
    }

    async fn build_intent(&self, matched: RuleMatch) -> NotificationIntent {
        let sender = match (&matched.sender_id, matched.kind.needs_sender_name()) {
            (Some(sender_id), true) => self.lookup(sender_id).await,
            _ => None,
        };
        let sender_name = sender
            .as_ref()
            .and_then(UserProfile::display_name)
            .unwrap_or(DEFAULT_SENDER_NAME);

        let content = matched.kind.render(&ContentContext {
            book_title: &matched.book_title,
            sender_name,
        });

        NotificationIntent::new(matched.kind, matched.recipient_id, content)
    }

    /// Deliver an intent: push to the recipient's device (when a token is on
    /// file) and append the notification record, concurrently. Both halves
    /// complete before this returns; neither one's failure affects the other.
    #[tracing::instrument(
        name = "notifier.deliver",
        skip(self, intent),
        fields(rule = %intent.kind, recipient_id = %intent.recipient_id)
    )]
    pub async fn deliver(&self, intent: &NotificationIntent) -> DeliveryOutcome {
        let recipient = self.lookup(&intent.recipient_id).await;
        let token = recipient.as_ref().and_then(UserProfile::token);

        let (push, record_id) = tokio::join!(self.send_push(intent, token), self.persist(intent));

        DeliveryOutcome { push, record_id }
    }

    async fn send_push(&self, intent: &NotificationIntent, token: Option<&str>) -> PushOutcome {
        let Some(token) = token else {
            self.stats.push_skipped.fetch_add(1, Ordering::Relaxed);
            DeliveryMetrics::record_push_skipped();
            tracing::debug!("Recipient has no device token, push skipped");
            return PushOutcome::Skipped;
        };

        match self.push.send(&intent.push_message(token)).await {
            Ok(()) => {
                self.stats.push_sent.fetch_add(1, Ordering::Relaxed);
                DeliveryMetrics::record_push_sent();
                tracing::info!("Push notification sent");
                PushOutcome::Sent
            }
            Err(e) => {
                self.stats.push_failed.fetch_add(1, Ordering::Relaxed);
                DeliveryMetrics::record_push_failed();
                tracing::error!(error = %e, "Failed to send push notification");
                PushOutcome::Failed
            }
        }
    }

    async fn persist(&self, intent: &NotificationIntent) -> Option<uuid::Uuid> {
        match self.store.append(intent.record()).await {
            Ok(record) => {
                self.stats.records_persisted.fetch_add(1, Ordering::Relaxed);
                DeliveryMetrics::record_persisted();
                tracing::info!(notification_id = %record.id, "Notification stored");
                Some(record.id)
            }
            Err(e) => {
                self.stats.records_failed.fetch_add(1, Ordering::Relaxed);
                DeliveryMetrics::record_persist_failed();
                tracing::error!(error = %e, "Failed to store notification");
                None
            }
        }
    }

    /// Profile lookup that degrades to "not found" on error
    async fn lookup(&self, user_id: &str) -> Option<UserProfile> {
        match self.users.get_user(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                DeliveryMetrics::record_lookup_failure();
                tracing::warn!(
                    error = %e,
                    user_id = %user_id,
                    "User lookup failed, continuing without profile"
                );
                None
            }
        }
    }
}
