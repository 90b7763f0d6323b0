//! Push delivery to user devices.
//!
//! # Backends
//!
//! - `log`: writes the message to the log and reports success (default)
//! - `fcm`: Firebase Cloud Messaging HTTP v1 API
//!
//! Use [`create_push_sender`] to build the sender selected by configuration.

mod fcm;
mod logging;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::PushConfig;

pub use fcm::FcmPushSender;
pub use logging::LogPushSender;

/// Errors that can occur while sending a push message.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Push service answered with a non-success status (invalid token, quota, ...)
    #[error("push service rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid push configuration: {0}")]
    Config(String),
}

/// Message addressed to one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub icon: String,
}

/// Token-based push delivery.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Backend name for health reporting
    fn backend_name(&self) -> &'static str;

    /// Send one message. Nothing from the response is consumed beyond success.
    async fn send(&self, message: &PushMessage) -> Result<(), PushError>;
}

/// Create the push sender selected by configuration.
///
/// - `"fcm"`: FCM sender when `project_id` and `access_token` are set
/// - `"log"` (default): log-only sender
///
/// Falls back to the log sender with a warning when FCM cannot be built.
pub fn create_push_sender(config: &PushConfig) -> Arc<dyn PushSender> {
    match config.backend.as_str() {
        "fcm" => match FcmPushSender::from_config(config) {
            Ok(sender) => {
                tracing::info!(
                    backend = "fcm",
                    endpoint = %config.endpoint,
                    "Creating FCM push sender"
                );
                Arc::new(sender)
            }
            Err(e) => {
                tracing::warn!(error = %e, "FCM push sender unavailable, falling back to log");
                Arc::new(LogPushSender)
            }
        },
        other => {
            if other != "log" {
                tracing::warn!(backend = %other, "Unknown push backend, using log");
            }
            tracing::info!(backend = "log", "Creating log push sender");
            Arc::new(LogPushSender)
        }
    }
}
