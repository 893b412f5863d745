//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_events_received_total` (counter): events accepted, by type class
//! - `gateway_events_dropped_total` (counter): async events lost to a full queue
//! - `gateway_function_invocations_total` (counter): calls by function and outcome
//! - `gateway_function_duration_seconds` (histogram): call latency
//! - `gateway_requests_total` (counter): events API responses by status
//! - `gateway_catalog_entries` (gauge): registered entities by kind

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
        }
    }
}

fn describe_metrics() {
    describe_counter!("gateway_events_received_total", "Events received by the events API");
    describe_counter!("gateway_events_dropped_total", "Async events dropped because the work queue was full");
    describe_counter!("gateway_function_invocations_total", "Function invocations by outcome");
    describe_histogram!("gateway_function_duration_seconds", "Function invocation latency");
    describe_counter!("gateway_requests_total", "Events API responses by status");
    describe_gauge!("gateway_catalog_entries", "Registered catalog entries by kind");
}

/// Record an accepted event. `class` is one of `custom`, `http`, `invoke`, `system`.
pub fn record_event_received(class: &'static str) {
    counter!("gateway_events_received_total", "class" => class).increment(1);
}

pub fn record_event_dropped() {
    counter!("gateway_events_dropped_total").increment(1);
}

/// Record the outcome of a function call.
pub fn record_invocation(function_id: &str, success: bool, start: Instant) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "gateway_function_invocations_total",
        "function" => function_id.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gateway_function_duration_seconds", "function" => function_id.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_request(method: &str, status: u16) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_catalog_size(kind: &'static str, count: usize) {
    gauge!("gateway_catalog_entries", "kind" => kind).set(count as f64);
}
