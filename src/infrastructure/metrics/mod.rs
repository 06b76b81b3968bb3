//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Broadcast job outcomes (sent, failed, dropped)
//! - Active WebSocket connections and online users
//! - Chat message outcomes (delivered, rejected, failed)
//! - Presence announcements by type

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Broadcast jobs by result: "sent", "failed", "dropped"
pub static BROADCAST_JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("broadcast_jobs_total", "Broadcast jobs by result").namespace("chat_relay"),
        &["result"],
    )
    .expect("Failed to create BROADCAST_JOBS_TOTAL metric")
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace("chat_relay"),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Users with at least one live connection
pub static ONLINE_USERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("online_users", "Number of users with a live connection").namespace("chat_relay"),
    )
    .expect("Failed to create ONLINE_USERS metric")
});

/// Inbound chat messages by outcome: "delivered", "rejected", "failed"
pub static MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_total", "Inbound chat messages by outcome").namespace("chat_relay"),
        &["outcome"],
    )
    .expect("Failed to create MESSAGES_TOTAL metric")
});

/// Presence announcements by type: "connect", "disconnect"
pub static PRESENCE_ANNOUNCEMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "presence_announcements_total",
            "Presence announcements broadcast by type",
        )
        .namespace("chat_relay"),
        &["type"],
    )
    .expect("Failed to create PRESENCE_ANNOUNCEMENTS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(BROADCAST_JOBS_TOTAL.clone()))
        .expect("Failed to register BROADCAST_JOBS_TOTAL");
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(ONLINE_USERS.clone()))
        .expect("Failed to register ONLINE_USERS");
    registry
        .register(Box::new(MESSAGES_TOTAL.clone()))
        .expect("Failed to register MESSAGES_TOTAL");
    registry
        .register(Box::new(PRESENCE_ANNOUNCEMENTS_TOTAL.clone()))
        .expect("Failed to register PRESENCE_ANNOUNCEMENTS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record the result of one broadcast job
pub fn record_broadcast_job(result: &str) {
    BROADCAST_JOBS_TOTAL.with_label_values(&[result]).inc();
}

/// Record the outcome of one inbound chat message
pub fn record_message(outcome: &str) {
    MESSAGES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a presence announcement
pub fn record_announcement(kind: &str) {
    PRESENCE_ANNOUNCEMENTS_TOTAL.with_label_values(&[kind]).inc();
}

/// Count a new connection, and a new online user if it was their first
pub fn connection_opened(came_online: bool) {
    WEBSOCKET_CONNECTIONS_ACTIVE.inc();
    if came_online {
        ONLINE_USERS.inc();
    }
}

/// Count a closed connection, and one fewer online user if it was their last
pub fn connection_closed(went_offline: bool) {
    WEBSOCKET_CONNECTIONS_ACTIVE.dec();
    if went_offline {
        ONLINE_USERS.dec();
    }
}
