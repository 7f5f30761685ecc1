// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! installed by the host process can collect these metrics. Without a
//! recorder every call is a no-op.

use metrics::{describe_counter, describe_histogram};

use switchyard_core::types::MetricEvent;

/// Register all Switchyard metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "switchyard_requests_total",
        "Completed orchestration requests by intent, tier and outcome"
    );
    describe_counter!("switchyard_tokens_total", "Tokens consumed by backend");
    describe_counter!("switchyard_cost_microdollars_total", "Spend in millionths of a USD by backend");
    describe_histogram!(
        "switchyard_request_duration_seconds",
        "End-to-end orchestration latency in seconds"
    );
    describe_histogram!(
        "switchyard_fallback_depth",
        "Failed candidate attempts before the outcome"
    );
    describe_counter!(
        "switchyard_circuit_transitions_total",
        "Circuit breaker state transitions by backend"
    );
    describe_counter!(
        "switchyard_summary_cache_lookups_total",
        "Summary cache lookups by result"
    );
    describe_counter!(
        "switchyard_metric_events_evicted_total",
        "Request events dropped by the event log's count bound before they aged out"
    );
}

/// Record one completed request.
pub fn record_event(event: &MetricEvent) {
    let outcome = if event.success { "success" } else { "failure" };
    metrics::counter!(
        "switchyard_requests_total",
        "intent" => event.intent.to_string(),
        "tier" => event.tier.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    metrics::histogram!("switchyard_request_duration_seconds")
        .record(event.duration.as_secs_f64());
    metrics::histogram!("switchyard_fallback_depth").record(f64::from(event.fallback_depth));

    if let Some(backend) = &event.backend {
        metrics::counter!("switchyard_tokens_total", "backend" => backend.clone(), "type" => "input")
            .increment(u64::from(event.usage.input_tokens));
        metrics::counter!("switchyard_tokens_total", "backend" => backend.clone(), "type" => "output")
            .increment(u64::from(event.usage.output_tokens));
        metrics::counter!("switchyard_cost_microdollars_total", "backend" => backend.clone())
            .increment((event.cost_usd * 1_000_000.0).round() as u64);
    }
}

/// Record events evicted from a full event log.
pub fn record_events_evicted(count: u64) {
    metrics::counter!("switchyard_metric_events_evicted_total").increment(count);
}

/// Record a circuit breaker transition.
pub fn record_circuit_transition(backend: &str, state: &'static str) {
    metrics::counter!(
        "switchyard_circuit_transitions_total",
        "backend" => backend.to_string(),
        "state" => state
    )
    .increment(1);
}

/// Record a summary cache lookup: `hit`, `miss`, or `corrupt`.
pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("switchyard_summary_cache_lookups_total", "result" => result).increment(1);
}
