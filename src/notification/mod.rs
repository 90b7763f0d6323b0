//! Notification intents and their delivery.
//!
//! A [`NotificationIntent`] is what a matching rule decides to send. The
//! [`TransitionNotifier`] expands it into a push message for the recipient's
//! device and a persisted notification record.

mod notifier;
mod types;

pub use notifier::{NotifierError, NotifierStats, NotifierStatsSnapshot, TransitionNotifier};
pub use types::{DeliveryOutcome, HandleReport, NotificationIntent, PushOutcome};
