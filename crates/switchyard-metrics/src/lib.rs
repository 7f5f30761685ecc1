// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request telemetry for the Switchyard routing pipeline.
//!
//! [`MetricsCollector`] keeps the append-only event log and serves windowed
//! aggregates. Every recorded event is also forwarded to the metrics-rs
//! facade via [`recording`], so a Prometheus or statsd recorder installed by
//! the host picks it up without further wiring.

pub mod collector;
pub mod recording;

pub use collector::{MetricsAggregate, MetricsCollector, MetricsPeriod, percentile};
pub use recording::{record_cache_lookup, record_circuit_transition, record_event, register_metrics};
