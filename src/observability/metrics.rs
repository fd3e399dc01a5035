//! Router metrics.
//!
//! # Metrics
//! - `topic_router_dispatch_total` (counter): topics handed to `handle`
//! - `topic_router_deliveries_total` (counter): successful subscriber calls
//! - `topic_router_subscriber_failures_total` (counter): by `kind` (panic, error)
//! - `topic_router_registrations_total` (counter): by `op` (register, unregister)
//! - `topic_router_invalid_topics_total` (counter): rejected topics
//! - `topic_router_routes` (gauge): distinct registered patterns
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - No exporter here; embedding applications install their own

use metrics::{counter, gauge};

pub fn record_dispatch() {
    counter!("topic_router_dispatch_total").increment(1);
}

pub fn record_delivery() {
    counter!("topic_router_deliveries_total").increment(1);
}

pub fn record_subscriber_failure(kind: &'static str) {
    counter!("topic_router_subscriber_failures_total", "kind" => kind).increment(1);
}

pub fn record_registration(op: &'static str) {
    counter!("topic_router_registrations_total", "op" => op).increment(1);
}

pub fn record_invalid_topic() {
    counter!("topic_router_invalid_topics_total").increment(1);
}

pub fn record_route_count(count: usize) {
    gauge!("topic_router_routes").set(count as f64);
}
