//! Transition rule table.
//!
//! Each [`Rule`] pairs a trigger with a condition predicate and a recipient
//! resolver; the [`NotificationKind`] it carries builds the content. Rules are
//! evaluated in table order and the first match wins, so a single change never
//! produces more than one notification.

mod content;

use serde::Serialize;

use crate::document::{
    DocumentChange, ExchangeRequest, Trigger, CONFIRMATION_CANCELLED, CONFIRMATION_CONFIRMED,
    STATUS_AWAITING_ADDRESS, STATUS_AWAITING_RECEIPT, STATUS_FINISHED_WITH_DIVERGENCE,
    STATUS_PENDING,
};

pub use content::{ContentContext, NotificationContent, NotificationKind, DEFAULT_SENDER_NAME};

/// Condition predicate over a decoded change
pub type Condition = fn(&DocumentChange) -> bool;

/// Picks the recipient user id out of a decoded change
pub type RecipientResolver = fn(&DocumentChange) -> Option<&str>;

/// One row of the rule table
#[derive(Clone, Copy)]
pub struct Rule {
    pub kind: NotificationKind,
    pub trigger: Trigger,
    condition: Condition,
    recipient: RecipientResolver,
}

impl Rule {
    pub const fn new(
        kind: NotificationKind,
        trigger: Trigger,
        condition: Condition,
        recipient: RecipientResolver,
    ) -> Self {
        Self {
            kind,
            trigger,
            condition,
            recipient,
        }
    }

    pub fn matches(&self, change: &DocumentChange) -> bool {
        change.trigger() == Some(self.trigger) && (self.condition)(change)
    }

    pub fn recipient<'a>(&self, change: &'a DocumentChange) -> Option<&'a str> {
        (self.recipient)(change)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("kind", &self.kind)
            .field("trigger", &self.trigger)
            .finish()
    }
}

/// Canonical rule set, in evaluation order
pub const STANDARD_RULES: [Rule; 9] = [
    Rule::new(
        NotificationKind::NewMessage,
        Trigger::MessageCreated,
        always,
        message_receiver,
    ),
    Rule::new(
        NotificationKind::NewExchangeRequest,
        Trigger::RequestCreated,
        always,
        request_owner,
    ),
    Rule::new(
        NotificationKind::RequestAccepted,
        Trigger::RequestUpdated,
        request_accepted,
        request_requester,
    ),
    Rule::new(
        NotificationKind::RequestRejected,
        Trigger::RequestDeleted,
        request_rejected,
        request_requester,
    ),
    Rule::new(
        NotificationKind::AddressDefined,
        Trigger::RequestUpdated,
        address_defined,
        request_requester,
    ),
    Rule::new(
        NotificationKind::AddressChanged,
        Trigger::RequestUpdated,
        address_changed,
        request_requester,
    ),
    Rule::new(
        NotificationKind::CancelledByRequester,
        Trigger::RequestUpdated,
        cancelled_by_requester,
        request_owner,
    ),
    Rule::new(
        NotificationKind::CancelledByOwner,
        Trigger::RequestUpdated,
        cancelled_by_owner,
        request_requester,
    ),
    Rule::new(
        NotificationKind::CancelledBeforeAddress,
        Trigger::RequestDeleted,
        cancelled_before_address,
        cancellation_counterparty,
    ),
];

/// Result of evaluating the table against one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub kind: NotificationKind,
    pub recipient_id: String,
    /// Title of the book the request refers to (fallback applied)
    pub book_title: String,
    /// Author of the message, for kinds that name the sender
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

/// Ordered set of rules
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(STANDARD_RULES.to_vec())
    }
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate the table and return the first match.
    ///
    /// A matching rule whose recipient id is missing from the snapshot ends
    /// evaluation without a match.
    pub fn evaluate(&self, change: &DocumentChange) -> Option<RuleMatch> {
        let rule = self.rules.iter().find(|rule| rule.matches(change))?;

        let Some(recipient_id) = rule.recipient(change).filter(|id| !id.is_empty()) else {
            tracing::warn!(
                rule = %rule.kind,
                "Rule matched but the recipient id is missing, skipping"
            );
            return None;
        };

        let (book_title, sender_id) = match change {
            DocumentChange::MessageCreated(message) => (
                crate::document::DEFAULT_BOOK_TITLE.to_string(),
                message.sender_id.clone(),
            ),
            _ => (
                current_request(change)
                    .map(|r| r.book_title())
                    .unwrap_or(crate::document::DEFAULT_BOOK_TITLE)
                    .to_string(),
                None,
            ),
        };

        Some(RuleMatch {
            kind: rule.kind,
            recipient_id: recipient_id.to_string(),
            book_title,
            sender_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Snapshot helpers
// ---------------------------------------------------------------------------

/// Request snapshot that describes the document as it is now
fn current_request(change: &DocumentChange) -> Option<&ExchangeRequest> {
    match change {
        DocumentChange::RequestCreated(request) | DocumentChange::RequestDeleted(request) => {
            Some(request)
        }
        DocumentChange::RequestUpdated { after, .. } => Some(after),
        _ => None,
    }
}

fn request_update(change: &DocumentChange) -> Option<(&ExchangeRequest, &ExchangeRequest)> {
    match change {
        DocumentChange::RequestUpdated { before, after } => Some((before, after)),
        _ => None,
    }
}

fn entered_status(change: &DocumentChange, status: &str) -> bool {
    request_update(change)
        .is_some_and(|(before, after)| !before.status_is(status) && after.status_is(status))
}

fn finished_with_divergence(before: &ExchangeRequest, after: &ExchangeRequest) -> bool {
    before.status_is(STATUS_AWAITING_RECEIPT) && after.status_is(STATUS_FINISHED_WITH_DIVERGENCE)
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

fn always(_: &DocumentChange) -> bool {
    true
}

fn request_accepted(change: &DocumentChange) -> bool {
    entered_status(change, STATUS_AWAITING_ADDRESS)
}

fn request_rejected(change: &DocumentChange) -> bool {
    matches!(change, DocumentChange::RequestDeleted(request) if request.status_is(STATUS_PENDING))
}

fn address_defined(change: &DocumentChange) -> bool {
    entered_status(change, STATUS_AWAITING_RECEIPT)
}

fn address_changed(change: &DocumentChange) -> bool {
    request_update(change).is_some_and(|(before, after)| {
        let previous = before.address_count();
        previous != 0 && previous + 1 == after.address_count()
    })
}

fn cancelled_by_requester(change: &DocumentChange) -> bool {
    let Some((before, after)) = request_update(change) else {
        return false;
    };
    if finished_with_divergence(before, after) {
        return false;
    }

    let cancelled = !before.requester_confirmation_is(CONFIRMATION_CANCELLED)
        && after.requester_confirmation_is(CONFIRMATION_CANCELLED)
        && after.status_is(STATUS_AWAITING_RECEIPT);

    if cancelled && before.owner_confirmation_is(CONFIRMATION_CONFIRMED) {
        tracing::debug!("Owner already confirmed receipt, cancellation notice suppressed");
        return false;
    }
    cancelled
}

fn cancelled_by_owner(change: &DocumentChange) -> bool {
    let Some((before, after)) = request_update(change) else {
        return false;
    };
    if finished_with_divergence(before, after) {
        return false;
    }

    let cancelled = !before.owner_confirmation_is(CONFIRMATION_CANCELLED)
        && after.owner_confirmation_is(CONFIRMATION_CANCELLED)
        && after.status_is(STATUS_AWAITING_RECEIPT);

    if cancelled && before.requester_confirmation_is(CONFIRMATION_CONFIRMED) {
        tracing::debug!("Requester already confirmed receipt, cancellation notice suppressed");
        return false;
    }
    cancelled
}

fn cancelled_before_address(change: &DocumentChange) -> bool {
    matches!(
        change,
        DocumentChange::RequestDeleted(request)
            if request.address_count() == 0
                && !request.status_is(STATUS_PENDING)
                && !request.is_finished()
    )
}

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

fn message_receiver(change: &DocumentChange) -> Option<&str> {
    match change {
        DocumentChange::MessageCreated(message) => message.receiver_id.as_deref(),
        _ => None,
    }
}

fn request_owner(change: &DocumentChange) -> Option<&str> {
    current_request(change).and_then(|r| r.owner_id.as_deref())
}

fn request_requester(change: &DocumentChange) -> Option<&str> {
    current_request(change).and_then(|r| r.requester_id.as_deref())
}

/// The party that did not cancel: the owner when the requester marked the
/// exchange cancelled, the requester otherwise.
fn cancellation_counterparty(change: &DocumentChange) -> Option<&str> {
    let request = current_request(change)?;
    if request.requester_confirmation_is(CONFIRMATION_CANCELLED) {
        request.owner_id.as_deref()
    } else {
        request.requester_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ChangeEvent, Collection};
    use serde_json::{json, Value};

    fn update(before: Value, after: Value) -> DocumentChange {
        DocumentChange::decode(&ChangeEvent::updated(Collection::Requests, "req-1", before, after))
            .unwrap()
    }

    fn deleted(snapshot: Value) -> DocumentChange {
        DocumentChange::decode(&ChangeEvent::deleted(Collection::Requests, "req-1", snapshot))
            .unwrap()
    }

    fn base_request(extra: Value) -> Value {
        let mut request = json!({
            "requesterId": "requester",
            "ownerId": "owner",
            "requestedBook": {"title": "Iracema"},
        });
        if let (Some(target), Some(fields)) = (request.as_object_mut(), extra.as_object()) {
            for (k, v) in fields {
                target.insert(k.clone(), v.clone());
            }
        }
        request
    }

    fn evaluate(change: &DocumentChange) -> Option<RuleMatch> {
        RuleTable::default().evaluate(change)
    }

    #[test]
    fn test_message_created_targets_receiver() {
        let change = DocumentChange::decode(&ChangeEvent::created(
            Collection::Messages,
            "msg-1",
            json!({"senderId": "alice", "receiverId": "bob", "text": "oi"}),
        ))
        .unwrap();

        let matched = evaluate(&change).unwrap();
        assert_eq!(matched.kind, NotificationKind::NewMessage);
        assert_eq!(matched.recipient_id, "bob");
        assert_eq!(matched.sender_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_message_without_receiver_is_skipped() {
        let change = DocumentChange::decode(&ChangeEvent::created(
            Collection::Messages,
            "msg-1",
            json!({"senderId": "alice"}),
        ))
        .unwrap();
        assert!(evaluate(&change).is_none());
    }

    #[test]
    fn test_request_created_targets_owner() {
        let change = DocumentChange::decode(&ChangeEvent::created(
            Collection::Requests,
            "req-1",
            base_request(json!({"status": "pending"})),
        ))
        .unwrap();

        let matched = evaluate(&change).unwrap();
        assert_eq!(matched.kind, NotificationKind::NewExchangeRequest);
        assert_eq!(matched.recipient_id, "owner");
        assert_eq!(matched.book_title, "Iracema");
    }

    #[test]
    fn test_accepted_fires_on_transition_only() {
        let change = update(
            base_request(json!({"status": STATUS_PENDING})),
            base_request(json!({"status": STATUS_AWAITING_ADDRESS})),
        );
        let matched = evaluate(&change).unwrap();
        assert_eq!(matched.kind, NotificationKind::RequestAccepted);
        assert_eq!(matched.recipient_id, "requester");

        let noop = update(
            base_request(json!({"status": STATUS_AWAITING_ADDRESS})),
            base_request(json!({"status": STATUS_AWAITING_ADDRESS})),
        );
        assert!(evaluate(&noop).is_none());
    }

    #[test]
    fn test_accepted_fires_from_absent_status() {
        let change = update(
            base_request(json!({})),
            base_request(json!({"status": STATUS_AWAITING_ADDRESS})),
        );
        assert_eq!(
            evaluate(&change).unwrap().kind,
            NotificationKind::RequestAccepted
        );
    }

    #[test]
    fn test_rejected_only_when_pending() {
        let pending = deleted(base_request(json!({"status": STATUS_PENDING})));
        let matched = evaluate(&pending).unwrap();
        assert_eq!(matched.kind, NotificationKind::RequestRejected);
        assert_eq!(matched.recipient_id, "requester");

        let finished = deleted(base_request(json!({
            "status": "Finalizado",
            "deliveryAddress": [{"street": "Rua A"}]
        })));
        assert!(evaluate(&finished).is_none());
    }

    #[test]
    fn test_address_defined() {
        let change = update(
            base_request(json!({"status": STATUS_AWAITING_ADDRESS})),
            base_request(json!({"status": STATUS_AWAITING_RECEIPT})),
        );
        let matched = evaluate(&change).unwrap();
        assert_eq!(matched.kind, NotificationKind::AddressDefined);
        assert_eq!(matched.recipient_id, "requester");
    }

    #[test]
    fn test_address_changed_requires_non_empty_previous_list() {
        let grew = update(
            base_request(json!({"status": STATUS_AWAITING_RECEIPT, "deliveryAddress": [{"a": 1}]})),
            base_request(json!({"status": STATUS_AWAITING_RECEIPT, "deliveryAddress": [{"a": 1}, {"a": 2}]})),
        );
        assert_eq!(
            evaluate(&grew).unwrap().kind,
            NotificationKind::AddressChanged
        );

        let first = update(
            base_request(json!({"status": STATUS_AWAITING_RECEIPT, "deliveryAddress": []})),
            base_request(json!({"status": STATUS_AWAITING_RECEIPT, "deliveryAddress": [{"a": 1}]})),
        );
        assert!(evaluate(&first).is_none());

        let jumped = update(
            base_request(json!({"deliveryAddress": [{"a": 1}]})),
            base_request(json!({"deliveryAddress": [{"a": 1}, {"a": 2}, {"a": 3}]})),
        );
        assert!(evaluate(&jumped).is_none());
    }

    #[test]
    fn test_cancelled_by_requester_targets_owner() {
        let change = update(
            base_request(json!({"status": STATUS_AWAITING_RECEIPT})),
            base_request(json!({
                "status": STATUS_AWAITING_RECEIPT,
                "requesterConfirmationStatus": CONFIRMATION_CANCELLED
            })),
        );
        let matched = evaluate(&change).unwrap();
        assert_eq!(matched.kind, NotificationKind::CancelledByRequester);
        assert_eq!(matched.recipient_id, "owner");
    }

    #[test]
    fn test_cancelled_by_owner_targets_requester() {
        let change = update(
            base_request(json!({"status": STATUS_AWAITING_RECEIPT})),
            base_request(json!({
                "status": STATUS_AWAITING_RECEIPT,
                "ownerConfirmationStatus": CONFIRMATION_CANCELLED
            })),
        );
        let matched = evaluate(&change).unwrap();
        assert_eq!(matched.kind, NotificationKind::CancelledByOwner);
        assert_eq!(matched.recipient_id, "requester");
    }

    #[test]
    fn test_cancellation_suppressed_when_counterparty_confirmed() {
        let by_requester = update(
            base_request(json!({
                "status": STATUS_AWAITING_RECEIPT,
                "ownerConfirmationStatus": CONFIRMATION_CONFIRMED
            })),
            base_request(json!({
                "status": STATUS_AWAITING_RECEIPT,
                "ownerConfirmationStatus": CONFIRMATION_CONFIRMED,
                "requesterConfirmationStatus": CONFIRMATION_CANCELLED
            })),
        );
        assert!(evaluate(&by_requester).is_none());

        let by_owner = update(
            base_request(json!({
                "status": STATUS_AWAITING_RECEIPT,
                "requesterConfirmationStatus": CONFIRMATION_CONFIRMED
            })),
            base_request(json!({
                "status": STATUS_AWAITING_RECEIPT,
                "requesterConfirmationStatus": CONFIRMATION_CONFIRMED,
                "ownerConfirmationStatus": CONFIRMATION_CANCELLED
            })),
        );
        assert!(evaluate(&by_owner).is_none());
    }

    #[test]
    fn test_cancellation_requires_awaiting_receipt() {
        let change = update(
            base_request(json!({"status": STATUS_AWAITING_RECEIPT})),
            base_request(json!({
                "status": STATUS_FINISHED_WITH_DIVERGENCE,
                "requesterConfirmationStatus": CONFIRMATION_CANCELLED
            })),
        );
        assert!(evaluate(&change).is_none());
    }

    #[test]
    fn test_owner_cancellation_requires_awaiting_receipt() {
        let into_divergence = update(
            base_request(json!({"status": STATUS_AWAITING_RECEIPT})),
            base_request(json!({
                "status": STATUS_FINISHED_WITH_DIVERGENCE,
                "ownerConfirmationStatus": CONFIRMATION_CANCELLED
            })),
        );
        assert!(evaluate(&into_divergence).is_none());

        let outside_receipt = update(
            base_request(json!({"status": STATUS_AWAITING_ADDRESS})),
            base_request(json!({
                "status": STATUS_AWAITING_ADDRESS,
                "ownerConfirmationStatus": CONFIRMATION_CANCELLED
            })),
        );
        assert!(evaluate(&outside_receipt).is_none());
    }

    #[test]
    fn test_repeated_cancellation_is_ignored() {
        let change = update(
            base_request(json!({
                "status": STATUS_AWAITING_RECEIPT,
                "requesterConfirmationStatus": CONFIRMATION_CANCELLED
            })),
            base_request(json!({
                "status": STATUS_AWAITING_RECEIPT,
                "requesterConfirmationStatus": CONFIRMATION_CANCELLED
            })),
        );
        assert!(evaluate(&change).is_none());
    }

    #[test]
    fn test_cancelled_before_address_picks_counterparty() {
        let by_requester = deleted(base_request(json!({
            "status": STATUS_AWAITING_ADDRESS,
            "requesterConfirmationStatus": CONFIRMATION_CANCELLED
        })));
        let matched = evaluate(&by_requester).unwrap();
        assert_eq!(matched.kind, NotificationKind::CancelledBeforeAddress);
        assert_eq!(matched.recipient_id, "owner");

        let by_owner = deleted(base_request(json!({"status": STATUS_AWAITING_ADDRESS})));
        let matched = evaluate(&by_owner).unwrap();
        assert_eq!(matched.kind, NotificationKind::CancelledBeforeAddress);
        assert_eq!(matched.recipient_id, "requester");
    }

    #[test]
    fn test_finished_deletion_is_silent() {
        let change = deleted(base_request(json!({"status": "Finalizado"})));
        assert!(evaluate(&change).is_none());

        let divergent = deleted(base_request(json!({"status": STATUS_FINISHED_WITH_DIVERGENCE})));
        assert!(evaluate(&divergent).is_none());
    }

    #[test]
    fn test_deleted_with_address_is_silent() {
        let change = deleted(base_request(json!({
            "status": STATUS_AWAITING_RECEIPT,
            "address": [{"street": "Rua A"}]
        })));
        assert!(evaluate(&change).is_none());
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        // Entering awaiting-receipt while the address list grows matches two rules
        let change = update(
            base_request(json!({"status": STATUS_AWAITING_ADDRESS, "deliveryAddress": [{"a": 1}]})),
            base_request(json!({"status": STATUS_AWAITING_RECEIPT, "deliveryAddress": [{"a": 1}, {"a": 2}]})),
        );
        assert!(address_changed(&change));
        assert_eq!(
            evaluate(&change).unwrap().kind,
            NotificationKind::AddressDefined
        );
    }

    #[test]
    fn test_table_order_follows_kind_order() {
        let kinds: Vec<_> = RuleTable::default().rules().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, NotificationKind::ALL.to_vec());
    }

    #[test]
    fn test_unrelated_update_matches_nothing() {
        let change = update(
            base_request(json!({"status": STATUS_AWAITING_RECEIPT})),
            base_request(json!({"status": STATUS_AWAITING_RECEIPT, "notes": "hello"})),
        );
        assert!(evaluate(&change).is_none());
    }
}
