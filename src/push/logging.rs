use async_trait::async_trait;

use super::{PushError, PushMessage, PushSender};

/// Sender that only logs. Used when no push service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPushSender;

#[async_trait]
impl PushSender for LogPushSender {
    fn backend_name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        tracing::info!(
            title = %message.title,
            body = %message.body,
            icon = %message.icon,
            "Push message (log backend)"
        );
        Ok(())
    }
}
