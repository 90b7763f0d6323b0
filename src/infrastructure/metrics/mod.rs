//! Prometheus metrics for the transition notifier.
//!
//! - Event metrics (received, rejected, handling latency)
//! - Rule metrics (intents produced per rule)
//! - Delivery metrics (push outcome, record outcome)
//! - Change feed metrics (Redis subscriber)

mod helpers;

pub use helpers::{encode_metrics, ChangeFeedMetrics, DeliveryMetrics, EventMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "notifier";

lazy_static! {
    // ============================================================================
    // Event Metrics
    // ============================================================================

    /// Change events received, by collection and lifecycle kind
    pub static ref EVENTS_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_received_total", METRIC_PREFIX),
        "Total change events received",
        &["collection", "kind"]
    ).unwrap();

    /// Change events rejected before rule evaluation
    pub static ref EVENTS_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_rejected_total", METRIC_PREFIX),
        "Total change events rejected as malformed"
    ).unwrap();

    /// Time spent handling one event, lookups and writes included
    pub static ref EVENT_HANDLING_SECONDS: Histogram = register_histogram!(
        format!("{}_event_handling_seconds", METRIC_PREFIX),
        "Event handling latency in seconds",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    // ============================================================================
    // Rule Metrics
    // ============================================================================

    /// Notification intents produced, by rule
    pub static ref INTENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_intents_total", METRIC_PREFIX),
        "Total notification intents produced",
        &["rule"]
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Push attempts by outcome (sent, skipped, failed)
    pub static ref PUSH_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_push_total", METRIC_PREFIX),
        "Total push deliveries by outcome",
        &["outcome"]
    ).unwrap();

    /// Notification record writes by outcome (persisted, failed)
    pub static ref RECORDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_records_total", METRIC_PREFIX),
        "Total notification record writes by outcome",
        &["outcome"]
    ).unwrap();

    /// Profile lookups that failed and were treated as missing
    pub static ref LOOKUP_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_lookup_failures_total", METRIC_PREFIX),
        "Total user profile lookups that failed"
    ).unwrap();

    // ============================================================================
    // Change Feed Metrics
    // ============================================================================

    /// Redis subscription status (1 = subscribed, 0 = disconnected)
    pub static ref CHANGE_FEED_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_change_feed_connected", METRIC_PREFIX),
        "Redis change feed subscription status (1=subscribed, 0=disconnected)"
    ).unwrap();

    /// Messages received from Redis pub/sub
    pub static ref CHANGE_FEED_MESSAGES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_change_feed_messages_total", METRIC_PREFIX),
        "Total messages received from the Redis change feed"
    ).unwrap();

    /// Redis reconnection attempts
    pub static ref CHANGE_FEED_RECONNECTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_change_feed_reconnections_total", METRIC_PREFIX),
        "Total Redis change feed reconnection attempts"
    ).unwrap();
}
