//! End-to-end notifier tests
//!
//! Drive `TransitionNotifier::handle` with change events against memory stores
//! and a recording push sender. No Redis, database or push service required.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use transition_notifier::document::{ChangeEvent, Collection};
use transition_notifier::notification::{PushOutcome, TransitionNotifier};
use transition_notifier::push::{PushError, PushMessage, PushSender};
use transition_notifier::rules::NotificationKind;
use transition_notifier::store::{
    MemoryNotificationStore, MemoryUserDirectory, NewNotification, NotificationStore, StoreError,
    StoredNotification, Stores, UserDirectory, UserProfile,
};

const AWAITING_ADDRESS: &str = "Aguardando confirmação do endereço";
const AWAITING_RECEIPT: &str = "Aguardando recebimento";

/// Push sender that records every message and can be told to fail
#[derive(Default)]
struct RecordingPushSender {
    sent: Mutex<Vec<PushMessage>>,
    fail: AtomicBool,
}

impl RecordingPushSender {
    fn failing() -> Self {
        let sender = Self::default();
        sender.fail.store(true, Ordering::SeqCst);
        sender
    }

    fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushError::Rejected {
                status: 404,
                body: "UNREGISTERED".to_string(),
            });
        }
        Ok(())
    }
}

/// Notification store whose writes always fail
struct BrokenStore;

#[async_trait]
impl NotificationStore for BrokenStore {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    async fn append(&self, _: NewNotification) -> Result<StoredNotification, StoreError> {
        Err(StoreError::Unavailable("write refused".to_string()))
    }

    async fn list_for_user(&self, _: &str) -> Result<Vec<StoredNotification>, StoreError> {
        Err(StoreError::Unavailable("read refused".to_string()))
    }
}

/// User directory whose lookups always fail
struct BrokenDirectory;

#[async_trait]
impl UserDirectory for BrokenDirectory {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    async fn get_user(&self, _: &str) -> Result<Option<UserProfile>, StoreError> {
        Err(StoreError::Unavailable("lookup refused".to_string()))
    }
}

struct TestEnvironment {
    notifier: TransitionNotifier,
    users: Arc<MemoryUserDirectory>,
    store: Arc<MemoryNotificationStore>,
    push: Arc<RecordingPushSender>,
}

fn environment_with(push: RecordingPushSender) -> TestEnvironment {
    let users = Arc::new(MemoryUserDirectory::new());
    let store = Arc::new(MemoryNotificationStore::new());
    let push = Arc::new(push);
    let notifier = TransitionNotifier::new(
        Stores {
            users: users.clone(),
            notifications: store.clone(),
        },
        push.clone(),
    );

    TestEnvironment {
        notifier,
        users,
        store,
        push,
    }
}

fn environment() -> TestEnvironment {
    environment_with(RecordingPushSender::default())
}

fn request(status: &str) -> Value {
    json!({
        "requesterId": "U1",
        "ownerId": "U2",
        "requestedBook": {"title": "Dom Casmurro"},
        "status": status,
        "requesterConfirmationStatus": "pendente",
        "ownerConfirmationStatus": "pendente"
    })
}

fn with_field(mut doc: Value, key: &str, value: Value) -> Value {
    doc[key] = value;
    doc
}

#[tokio::test]
async fn test_accepted_request_pushes_and_persists() {
    let env = environment();
    env.users
        .upsert(UserProfile::new("U1").with_name("Ana").with_device_token("T1"));

    let event = ChangeEvent::updated(
        Collection::Requests,
        "r-1",
        request("pending"),
        request(AWAITING_ADDRESS),
    );
    let report = env.notifier.handle(&event).await.unwrap();

    let intent = report.intent.expect("accepted request must notify");
    assert_eq!(intent.kind, NotificationKind::RequestAccepted);
    assert_eq!(intent.recipient_id, "U1");

    let sent = env.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "T1");
    assert!(sent[0].body.contains("Dom Casmurro"));

    let records = env.store.list_for_user("U1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_unread);
    assert_eq!(records[0].title, "Pedido Aceito");
    assert_eq!(report.delivery.unwrap().record_id, Some(records[0].id));
}

#[tokio::test]
async fn test_unchanged_awaiting_address_is_silent() {
    let env = environment();
    let event = ChangeEvent::updated(
        Collection::Requests,
        "r-1",
        request(AWAITING_ADDRESS),
        request(AWAITING_ADDRESS),
    );

    let report = env.notifier.handle(&event).await.unwrap();
    assert!(!report.matched());
    assert_eq!(env.store.total(), 0);
}

#[tokio::test]
async fn test_every_message_notifies_receiver() {
    let env = environment();
    env.users.upsert(UserProfile::new("A").with_name("Bruno"));
    env.users.upsert(UserProfile::new("B").with_device_token("TB"));

    for (i, text) in ["oi", "", "tudo bem?"].iter().enumerate() {
        let event = ChangeEvent::created(
            Collection::Messages,
            format!("m-{}", i),
            json!({"senderId": "A", "receiverId": "B", "text": text}),
        );
        let report = env.notifier.handle(&event).await.unwrap();
        assert_eq!(report.intent.unwrap().recipient_id, "B");
    }

    assert_eq!(env.push.sent().len(), 3);
    assert!(env.push.sent()[0].body.contains("Bruno"));
    assert_eq!(env.store.list_for_user("B").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_new_request_notifies_owner() {
    let env = environment();
    let event = ChangeEvent::created(Collection::Requests, "r-1", request("pending"));

    let report = env.notifier.handle(&event).await.unwrap();
    let intent = report.intent.unwrap();
    assert_eq!(intent.kind, NotificationKind::NewExchangeRequest);
    assert_eq!(intent.recipient_id, "U2");
    assert_eq!(
        intent.body,
        "Seu livro \"Dom Casmurro\" recebeu uma oferta de troca."
    );
}

#[tokio::test]
async fn test_deleted_pending_request_is_rejection() {
    let env = environment();
    let event = ChangeEvent::deleted(Collection::Requests, "r-1", request("pending"));

    let report = env.notifier.handle(&event).await.unwrap();
    let intent = report.intent.unwrap();
    assert_eq!(intent.kind, NotificationKind::RequestRejected);
    assert_eq!(intent.recipient_id, "U1");
}

#[tokio::test]
async fn test_deleted_finished_request_is_silent() {
    let env = environment();
    env.users.upsert(UserProfile::new("U1").with_device_token("T1"));
    env.users.upsert(UserProfile::new("U2").with_device_token("T2"));

    let event = ChangeEvent::deleted(Collection::Requests, "r-1", request("Finalizado"));
    let report = env.notifier.handle(&event).await.unwrap();

    assert!(!report.matched());
    assert!(env.push.sent().is_empty());
    assert_eq!(env.store.total(), 0);
}

#[tokio::test]
async fn test_address_defined_and_changed() {
    let env = environment();
    let before = with_field(request(AWAITING_ADDRESS), "deliveryAddress", json!([]));
    let after = with_field(
        request(AWAITING_RECEIPT),
        "deliveryAddress",
        json!([{"street": "Rua A"}]),
    );
    let report = env
        .notifier
        .handle(&ChangeEvent::updated(Collection::Requests, "r-1", before, after.clone()))
        .await
        .unwrap();
    assert_eq!(report.intent.unwrap().kind, NotificationKind::AddressDefined);

    let changed = with_field(
        request(AWAITING_RECEIPT),
        "deliveryAddress",
        json!([{"street": "Rua A"}, {"street": "Rua B"}]),
    );
    let report = env
        .notifier
        .handle(&ChangeEvent::updated(Collection::Requests, "r-1", after, changed))
        .await
        .unwrap();
    let intent = report.intent.unwrap();
    assert_eq!(intent.kind, NotificationKind::AddressChanged);
    assert_eq!(intent.recipient_id, "U1");
}

#[tokio::test]
async fn test_cancellation_after_confirmation_is_suppressed() {
    let env = environment();
    let before = with_field(
        request(AWAITING_RECEIPT),
        "ownerConfirmationStatus",
        json!("confirmado"),
    );
    let after = with_field(before.clone(), "requesterConfirmationStatus", json!("cancelado"));

    let report = env
        .notifier
        .handle(&ChangeEvent::updated(Collection::Requests, "r-1", before, after))
        .await
        .unwrap();
    assert!(!report.matched());
    assert_eq!(env.store.total(), 0);
}

#[tokio::test]
async fn test_requester_cancellation_notifies_owner() {
    let env = environment();
    let before = request(AWAITING_RECEIPT);
    let after = with_field(before.clone(), "requesterConfirmationStatus", json!("cancelado"));

    let report = env
        .notifier
        .handle(&ChangeEvent::updated(Collection::Requests, "r-1", before, after))
        .await
        .unwrap();
    let intent = report.intent.unwrap();
    assert_eq!(intent.kind, NotificationKind::CancelledByRequester);
    assert_eq!(intent.recipient_id, "U2");
}

#[tokio::test]
async fn test_owner_cancellation_notifies_requester() {
    let env = environment();
    env.users.upsert(UserProfile::new("U1").with_device_token("T1"));
    let before = request(AWAITING_RECEIPT);
    let after = with_field(before.clone(), "ownerConfirmationStatus", json!("cancelado"));

    let report = env
        .notifier
        .handle(&ChangeEvent::updated(Collection::Requests, "r-1", before, after))
        .await
        .unwrap();
    let intent = report.intent.unwrap();
    assert_eq!(intent.kind, NotificationKind::CancelledByOwner);
    assert_eq!(intent.recipient_id, "U1");
    assert_eq!(intent.title, "Troca Cancelada");
    assert_eq!(
        intent.body,
        "O proprietário do livro \"Dom Casmurro\" cancelou a troca."
    );
    assert_eq!(env.push.sent().len(), 1);
    assert_eq!(env.store.list_for_user("U1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_push_failure_still_persists() {
    let env = environment_with(RecordingPushSender::failing());
    env.users.upsert(UserProfile::new("U1").with_device_token("stale"));

    let event = ChangeEvent::deleted(Collection::Requests, "r-1", request("pending"));
    let report = env.notifier.handle(&event).await.unwrap();

    let delivery = report.delivery.unwrap();
    assert_eq!(delivery.push, PushOutcome::Failed);
    assert!(delivery.persisted());
    assert_eq!(env.store.list_for_user("U1").await.unwrap().len(), 1);
    assert_eq!(env.notifier.stats().push_failed, 1);
}

#[tokio::test]
async fn test_store_failure_does_not_block_push() {
    let users = Arc::new(MemoryUserDirectory::new());
    users.upsert(UserProfile::new("U1").with_device_token("T1"));
    let push = Arc::new(RecordingPushSender::default());
    let notifier = TransitionNotifier::new(
        Stores {
            users,
            notifications: Arc::new(BrokenStore),
        },
        push.clone(),
    );

    let event = ChangeEvent::deleted(Collection::Requests, "r-1", request("pending"));
    let report = notifier.handle(&event).await.unwrap();

    let delivery = report.delivery.unwrap();
    assert_eq!(delivery.push, PushOutcome::Sent);
    assert!(!delivery.persisted());
    assert_eq!(push.sent().len(), 1);
    assert_eq!(notifier.stats().records_failed, 1);
}

#[tokio::test]
async fn test_lookup_failure_degrades_to_defaults() {
    let store = Arc::new(MemoryNotificationStore::new());
    let push = Arc::new(RecordingPushSender::default());
    let notifier = TransitionNotifier::new(
        Stores {
            users: Arc::new(BrokenDirectory),
            notifications: store.clone(),
        },
        push.clone(),
    );

    let event = ChangeEvent::created(
        Collection::Messages,
        "m-1",
        json!({"senderId": "A", "receiverId": "B"}),
    );
    let report = notifier.handle(&event).await.unwrap();

    let intent = report.intent.unwrap();
    assert_eq!(intent.body, "Você recebeu uma mensagem de Usuário.");
    assert_eq!(report.delivery.unwrap().push, PushOutcome::Skipped);
    assert!(push.sent().is_empty());
    assert_eq!(store.total(), 1);
}

#[tokio::test]
async fn test_structured_message_still_notifies_receiver() {
    let env = environment();
    let event = ChangeEvent::created(
        Collection::Messages,
        "m-1",
        json!({"senderId": 42, "receiverId": "B", "text": {"imageUrl": "x.png"}}),
    );

    let report = env.notifier.handle(&event).await.unwrap();
    let intent = report.intent.unwrap();
    assert_eq!(intent.kind, NotificationKind::NewMessage);
    assert_eq!(intent.recipient_id, "B");
    assert_eq!(intent.body, "Você recebeu uma mensagem de Usuário.");
    assert_eq!(env.store.total(), 1);
}

#[tokio::test]
async fn test_untyped_book_falls_back_to_default_title() {
    let env = environment();
    let doc = with_field(request("pending"), "requestedBook", json!("Iracema"));

    let report = env
        .notifier
        .handle(&ChangeEvent::created(Collection::Requests, "r-1", doc))
        .await
        .unwrap();
    let intent = report.intent.unwrap();
    assert_eq!(intent.kind, NotificationKind::NewExchangeRequest);
    assert_eq!(intent.recipient_id, "U2");
    assert!(intent.body.contains("\"Livro\""));
}

#[tokio::test]
async fn test_non_object_snapshot_is_rejected() {
    let env = environment();
    let event = ChangeEvent::created(Collection::Messages, "m-1", json!(["A", "B"]));

    assert!(env.notifier.handle(&event).await.is_err());
    assert_eq!(env.store.total(), 0);
}
