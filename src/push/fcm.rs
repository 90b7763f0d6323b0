//! Firebase Cloud Messaging HTTP v1 sender.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::PushConfig;

use super::{PushError, PushMessage, PushSender};

/// `messages:send` request body
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    android: AndroidConfig<'a>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct AndroidConfig<'a> {
    notification: AndroidNotification<'a>,
}

#[derive(Debug, Serialize)]
struct AndroidNotification<'a> {
    icon: &'a str,
}

/// FCM sender authenticated with a bearer access token.
pub struct FcmPushSender {
    client: Client,
    send_url: String,
    access_token: String,
}

impl FcmPushSender {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PushError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                endpoint.trim_end_matches('/'),
                project_id
            ),
            access_token: access_token.into(),
        })
    }

    pub fn from_config(config: &PushConfig) -> Result<Self, PushError> {
        let project_id = config
            .project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PushError::Config("push.project_id is required".to_string()))?;
        let access_token = config
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PushError::Config("push.access_token is required".to_string()))?;

        Self::new(
            &config.endpoint,
            project_id,
            access_token,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    fn backend_name(&self) -> &'static str {
        "fcm"
    }

    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        let request = SendRequest {
            message: FcmMessage {
                token: &message.token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
                android: AndroidConfig {
                    notification: AndroidNotification {
                        icon: &message.icon,
                    },
                },
            },
        };

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = status.as_u16(), "FCM accepted push message");
        Ok(())
    }
}
