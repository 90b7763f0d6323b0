use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::config::RedisConfig;
use crate::document::ChangeEvent;
use crate::metrics::ChangeFeedMetrics;
use crate::notification::TransitionNotifier;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(500);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Redis Pub/Sub subscriber feeding change events to the notifier.
///
/// Every message carries one JSON [`ChangeEvent`] and is handled in its own
/// task, so a slow delivery never blocks the stream. In-flight tasks are
/// drained before [`ChangeFeedSubscriber::start`] returns.
pub struct ChangeFeedSubscriber {
    config: RedisConfig,
    notifier: Arc<TransitionNotifier>,
    shutdown: broadcast::Sender<()>,
}

impl ChangeFeedSubscriber {
    /// Create a new change-feed subscriber
    pub fn new(config: RedisConfig, notifier: Arc<TransitionNotifier>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            notifier,
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Start the subscriber loop, reconnecting until shutdown
    pub async fn start(&self) -> anyhow::Result<()> {
        let channels = self.get_channels();
        tracing::info!(channels = ?channels, "Starting Redis change feed subscriber");

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut backoff = ReconnectBackoff::default();
        let mut tasks = JoinSet::new();

        loop {
            match self
                .run_subscription_loop(&channels, &mut backoff, &mut tasks)
                .await
            {
                Ok(()) => {
                    tracing::info!("Redis change feed subscriber stopped gracefully");
                    break;
                }
                Err(e) => {
                    ChangeFeedMetrics::set_connected(false);
                    ChangeFeedMetrics::record_reconnection();
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Redis subscription error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        ChangeFeedMetrics::set_connected(false);
        drain(&mut tasks).await;
        Ok(())
    }

    /// Get configured channels
    fn get_channels(&self) -> Vec<String> {
        if self.config.channels.is_empty() {
            vec!["documents:*".to_string()]
        } else {
            self.config.channels.clone()
        }
    }

    /// Run the subscription loop
    async fn run_subscription_loop(
        &self,
        channels: &[String],
        backoff: &mut ReconnectBackoff,
        tasks: &mut JoinSet<()>,
    ) -> anyhow::Result<()> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        // Subscribe to channels (with pattern support)
        for channel in channels {
            if is_pattern(channel) {
                pubsub.psubscribe(channel).await?;
                tracing::debug!(pattern = %channel, "Subscribed to pattern");
            } else {
                pubsub.subscribe(channel).await?;
                tracing::debug!(channel = %channel, "Subscribed to channel");
            }
        }

        ChangeFeedMetrics::set_connected(true);
        backoff.reset();
        tracing::info!("Redis subscription established");

        let mut message_stream = pubsub.on_message();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(msg) => {
                            let channel = msg.get_channel_name().to_string();
                            let payload: String = match msg.get_payload() {
                                Ok(p) => p,
                                Err(e) => {
                                    tracing::warn!(error = %e, "Failed to get message payload");
                                    continue;
                                }
                            };

                            self.dispatch(tasks, channel, payload);
                        }
                        None => {
                            anyhow::bail!("Redis message stream ended");
                        }
                    }
                }
            }
        }
    }

    /// Parse a message and hand it to the notifier on its own task
    fn dispatch(&self, tasks: &mut JoinSet<()>, channel: String, payload: String) {
        ChangeFeedMetrics::record_message();

        // Reap finished handlers so the set only holds in-flight work
        while tasks.try_join_next().is_some() {}

        let Some(event) = parse_event(&channel, &payload) else {
            return;
        };
        spawn_handler(tasks, self.notifier.clone(), channel, event);
    }
}

/// Capped doubling delay between reconnect attempts
#[derive(Debug)]
struct ReconnectBackoff {
    current: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            current: INITIAL_RECONNECT_DELAY,
        }
    }
}

impl ReconnectBackoff {
    /// Delay to wait now; the following one doubles up to the cap
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_RECONNECT_DELAY);
        delay
    }

    /// Start over after a subscription was established
    fn reset(&mut self) {
        self.current = INITIAL_RECONNECT_DELAY;
    }
}

fn spawn_handler(
    tasks: &mut JoinSet<()>,
    notifier: Arc<TransitionNotifier>,
    channel: String,
    event: ChangeEvent,
) {
    tasks.spawn(async move {
        // Malformed snapshots are already logged and counted by the notifier
        if let Ok(report) = notifier.handle(&event).await {
            tracing::debug!(
                channel = %channel,
                document_id = %report.document_id,
                matched = report.matched(),
                "Handled change feed event"
            );
        }
    });
}

/// Wait for every in-flight handler to finish
async fn drain(tasks: &mut JoinSet<()>) {
    if tasks.is_empty() {
        return;
    }

    tracing::info!(pending = tasks.len(), "Waiting for in-flight change feed events");
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Change feed handler task failed");
        }
    }
}

fn is_pattern(channel: &str) -> bool {
    channel.contains('*') || channel.contains('?') || channel.contains('[')
}

/// Decode a Pub/Sub payload, logging and dropping anything that is not a change event
fn parse_event(channel: &str, payload: &str) -> Option<ChangeEvent> {
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(
                error = %e,
                channel = %channel,
                payload = %payload,
                "Failed to parse change feed message"
            );
            None
        }
    }
}
