//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatehouse_requests_total` (counter): requests evaluated
//! - `gatehouse_threats_total` (counter): signature matches by category
//! - `gatehouse_blocked_total` (counter): blocked requests by reason
//! - `gatehouse_rate_limited_total` (counter): denials by action
//! - `gatehouse_blacklisted_total` (counter): blacklist transitions
//! - `gatehouse_events_total` (counter): security events by kind
//! - `gatehouse_alerts_total` (counter): fired alerts by rule
//! - `gatehouse_key_rotations_total` (counter): key rotations
//! - `gatehouse_tracked_identities` (gauge): tracker population
//!
//! # Design Decisions
//! - Low-overhead updates (atomic operations in the metrics registry)
//! - Exporter installation is optional; recording without it is a no-op

use metrics::{counter, gauge};

/// Install the Prometheus exporter on `addr`. Failure is logged, not
/// fatal: the pipeline keeps working without exposition.
pub fn init_metrics(addr: std::net::SocketAddr) {
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        tracing::error!(error = %e, "failed to install metrics exporter");
    }
}

pub fn record_request() {
    counter!("gatehouse_requests_total").increment(1);
}

pub fn record_threat(category: &'static str) {
    counter!("gatehouse_threats_total", "category" => category).increment(1);
}

pub fn record_blocked(reason: &'static str) {
    counter!("gatehouse_blocked_total", "reason" => reason).increment(1);
}

pub fn record_warned() {
    counter!("gatehouse_warned_total").increment(1);
}

pub fn record_rate_limited(action: &str) {
    counter!("gatehouse_rate_limited_total", "action" => action.to_string()).increment(1);
}

pub fn record_blacklisted() {
    counter!("gatehouse_blacklisted_total").increment(1);
}

pub fn record_security_event(kind: &'static str) {
    counter!("gatehouse_events_total", "kind" => kind).increment(1);
}

pub fn record_alert(rule: &'static str) {
    counter!("gatehouse_alerts_total", "rule" => rule).increment(1);
}

pub fn record_key_rotation() {
    counter!("gatehouse_key_rotations_total").increment(1);
}

pub fn record_tracked_identities(count: usize) {
    gauge!("gatehouse_tracked_identities").set(count as f64);
}
