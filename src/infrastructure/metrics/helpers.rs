//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CHANGE_FEED_CONNECTED, CHANGE_FEED_MESSAGES_TOTAL, CHANGE_FEED_RECONNECTIONS_TOTAL,
    EVENTS_RECEIVED_TOTAL, EVENTS_REJECTED_TOTAL, EVENT_HANDLING_SECONDS, INTENTS_TOTAL,
    LOOKUP_FAILURES_TOTAL, PUSH_TOTAL, RECORDS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording event metrics
pub struct EventMetrics;

impl EventMetrics {
    /// Record a received change event
    pub fn record_received(collection: &str, kind: &str) {
        EVENTS_RECEIVED_TOTAL
            .with_label_values(&[collection, kind])
            .inc();
    }

    /// Record an event rejected as malformed
    pub fn record_rejected() {
        EVENTS_REJECTED_TOTAL.inc();
    }

    /// Record the time spent handling one event
    pub fn record_handling_time(seconds: f64) {
        EVENT_HANDLING_SECONDS.observe(seconds);
    }

    /// Record an intent produced by a rule
    pub fn record_intent(rule: &str) {
        INTENTS_TOTAL.with_label_values(&[rule]).inc();
    }
}

/// Helper struct for recording delivery metrics
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    pub fn record_push_sent() {
        PUSH_TOTAL.with_label_values(&["sent"]).inc();
    }

    /// Record a push skipped because the recipient has no device token
    pub fn record_push_skipped() {
        PUSH_TOTAL.with_label_values(&["skipped"]).inc();
    }

    pub fn record_push_failed() {
        PUSH_TOTAL.with_label_values(&["failed"]).inc();
    }

    pub fn record_persisted() {
        RECORDS_TOTAL.with_label_values(&["persisted"]).inc();
    }

    pub fn record_persist_failed() {
        RECORDS_TOTAL.with_label_values(&["failed"]).inc();
    }

    pub fn record_lookup_failure() {
        LOOKUP_FAILURES_TOTAL.inc();
    }
}

/// Helper struct for recording Redis change feed metrics
pub struct ChangeFeedMetrics;

impl ChangeFeedMetrics {
    pub fn set_connected(connected: bool) {
        CHANGE_FEED_CONNECTED.set(if connected { 1 } else { 0 });
    }

    pub fn record_message() {
        CHANGE_FEED_MESSAGES_TOTAL.inc();
    }

    pub fn record_reconnection() {
        CHANGE_FEED_RECONNECTIONS_TOTAL.inc();
    }
}
