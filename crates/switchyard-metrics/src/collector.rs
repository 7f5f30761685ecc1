// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only request event log with windowed aggregation.
//!
//! Aggregates are never stored: each query recomputes them from the events
//! whose timestamp falls in `[now - period, now]`. Recording and querying go
//! through one `RwLock`, so a query sees each event either completely or not
//! at all.
//!
//! Retention pruning bounds the log by age and `max_events` bounds it by
//! count. When the count bound evicts events that are still inside the
//! retention window, longer periods undercount; this is logged at `warn` once
//! per overflow and counted in `switchyard_metric_events_evicted_total`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use switchyard_config::model::{MetricsConfig, ModelCandidate, SwitchyardConfig};
use switchyard_core::{MetricEvent, SwitchyardError};
use switchyard_cost::ModelPricing;

use crate::recording;

/// Supported aggregation periods.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
pub enum MetricsPeriod {
    #[strum(serialize = "1m")]
    #[serde(rename = "1m")]
    OneMinute,
    #[strum(serialize = "5m")]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[strum(serialize = "1h")]
    #[serde(rename = "1h")]
    OneHour,
    #[strum(serialize = "1d")]
    #[serde(rename = "1d")]
    OneDay,
}

impl MetricsPeriod {
    pub const ALL: [MetricsPeriod; 4] = [
        MetricsPeriod::OneMinute,
        MetricsPeriod::FiveMinutes,
        MetricsPeriod::OneHour,
        MetricsPeriod::OneDay,
    ];

    pub fn duration(self) -> Duration {
        match self {
            MetricsPeriod::OneMinute => Duration::from_secs(60),
            MetricsPeriod::FiveMinutes => Duration::from_secs(5 * 60),
            MetricsPeriod::OneHour => Duration::from_secs(60 * 60),
            MetricsPeriod::OneDay => Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Aggregate over the events of one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsAggregate {
    pub period: MetricsPeriod,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,

    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub requests_per_minute: f64,

    pub avg_duration_ms: f64,
    pub p50_duration_ms: f64,
    pub p95_duration_ms: f64,
    pub p99_duration_ms: f64,

    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    /// Document tokens removed by preprocessing.
    pub tokens_saved: u64,

    pub total_cost_usd: f64,
    /// What the same token volume would have cost on the baseline model.
    pub baseline_cost_usd: f64,
    pub cost_saved_usd: f64,
    pub baseline_model: String,

    pub avg_fallback_depth: f64,
    /// Share of preprocessed requests served from the summary cache.
    pub cache_hit_rate: f64,

    pub intent_distribution: BTreeMap<String, u64>,
    pub tier_distribution: BTreeMap<String, u64>,
    pub backend_distribution: BTreeMap<String, u64>,
}

/// Thread-safe, append-only event log.
#[derive(Debug)]
pub struct MetricsCollector {
    events: RwLock<VecDeque<MetricEvent>>,
    retention: Duration,
    max_events: usize,
    /// Set while the count bound is evicting retained events.
    overflowing: AtomicBool,
    evicted: AtomicU64,
    baseline_model: String,
    baseline: ModelPricing,
}

impl MetricsCollector {
    pub fn new(config: &MetricsConfig, baseline: &ModelCandidate) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            retention: Duration::from_secs(config.retention_secs),
            max_events: config.max_events.max(1),
            overflowing: AtomicBool::new(false),
            evicted: AtomicU64::new(0),
            baseline_model: baseline.id.clone(),
            baseline: ModelPricing::from(baseline),
        }
    }

    /// Build from the full configuration, resolving the baseline model.
    pub fn from_config(config: &SwitchyardConfig) -> Result<Self, SwitchyardError> {
        let baseline = config.model(&config.routing.baseline_model).ok_or_else(|| {
            SwitchyardError::Config(format!(
                "baseline model `{}` is not declared",
                config.routing.baseline_model
            ))
        })?;
        Ok(Self::new(&config.metrics, baseline))
    }

    /// Append one event. Events older than the retention period are pruned,
    /// then the oldest events beyond `max_events`.
    pub fn record(&self, event: MetricEvent) {
        recording::record_event(&event);
        tracing::debug!(
            intent = %event.intent,
            tier = %event.tier,
            backend = event.backend.as_deref().unwrap_or("-"),
            success = event.success,
            "metric event recorded"
        );

        let cutoff = saturating_sub(Utc::now(), self.retention);
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.push_back(event);
        while events.front().is_some_and(|e| e.timestamp < cutoff) {
            events.pop_front();
        }
        let overflow = events.len().saturating_sub(self.max_events);
        events.drain(..overflow);
        let below_bound = events.len() < self.max_events;
        drop(events);

        if overflow == 0 {
            if below_bound {
                self.overflowing.store(false, Ordering::Relaxed);
            }
            return;
        }
        self.evicted.fetch_add(overflow as u64, Ordering::Relaxed);
        recording::record_events_evicted(overflow as u64);
        if !self.overflowing.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                max_events = self.max_events,
                retention_secs = self.retention.as_secs(),
                "metric event log is full, evicting events inside the retention window"
            );
        }
    }

    /// Events dropped by the count bound before they aged out.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate over the trailing `period` ending now.
    pub fn query(&self, period: MetricsPeriod) -> MetricsAggregate {
        self.query_at(period, Utc::now())
    }

    /// Aggregate over `[now - period, now]`.
    pub fn query_at(&self, period: MetricsPeriod, now: DateTime<Utc>) -> MetricsAggregate {
        let window_start = saturating_sub(now, period.duration());

        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let window: Vec<&MetricEvent> = events
            .iter()
            .filter(|e| e.timestamp >= window_start && e.timestamp <= now)
            .collect();

        self.aggregate(period, window_start, now, &window)
    }

    fn aggregate(
        &self,
        period: MetricsPeriod,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        events: &[&MetricEvent],
    ) -> MetricsAggregate {
        let total = events.len() as u64;
        let successful = events.iter().filter(|e| e.success).count() as u64;

        let mut durations: Vec<f64> = events
            .iter()
            .map(|e| e.duration.as_secs_f64() * 1000.0)
            .collect();
        durations.sort_by(f64::total_cmp);

        let mut input_tokens = 0u64;
        let mut output_tokens = 0u64;
        let mut tokens_saved = 0u64;
        let mut cost = 0.0;
        let mut baseline_cost = 0.0;
        let mut depth_sum = 0u64;
        let mut preprocessed = 0u64;
        let mut cache_hits = 0u64;
        let mut intents = BTreeMap::new();
        let mut tiers = BTreeMap::new();
        let mut backends = BTreeMap::new();

        for event in events {
            input_tokens += u64::from(event.usage.input_tokens);
            output_tokens += u64::from(event.usage.output_tokens);
            tokens_saved += event.tokens_saved;
            cost += event.cost_usd;
            baseline_cost += self.baseline.cost_for(
                u64::from(event.usage.input_tokens),
                u64::from(event.usage.output_tokens),
            );
            depth_sum += u64::from(event.fallback_depth);
            if event.preprocessed {
                preprocessed += 1;
                if event.cache_hit {
                    cache_hits += 1;
                }
            }
            *intents.entry(event.intent.to_string()).or_insert(0) += 1;
            *tiers.entry(event.tier.to_string()).or_insert(0) += 1;
            if let Some(backend) = &event.backend {
                *backends.entry(backend.clone()).or_insert(0) += 1;
            }
        }

        let minutes = period.duration().as_secs_f64() / 60.0;

        MetricsAggregate {
            period,
            window_start,
            window_end,
            total_requests: total,
            successful_requests: successful,
            failed_requests: total - successful,
            success_rate: ratio(successful, total),
            requests_per_minute: total as f64 / minutes,
            avg_duration_ms: mean(&durations),
            p50_duration_ms: percentile(&durations, 0.50),
            p95_duration_ms: percentile(&durations, 0.95),
            p99_duration_ms: percentile(&durations, 0.99),
            total_input_tokens: input_tokens,
            total_output_tokens: output_tokens,
            total_tokens: input_tokens + output_tokens,
            tokens_saved,
            total_cost_usd: cost,
            baseline_cost_usd: baseline_cost,
            cost_saved_usd: baseline_cost - cost,
            baseline_model: self.baseline_model.clone(),
            avg_fallback_depth: ratio(depth_sum, total),
            cache_hit_rate: ratio(cache_hits, preprocessed),
            intent_distribution: intents,
            tier_distribution: tiers,
            backend_distribution: backends,
        }
    }
}

fn saturating_sub(at: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(d)
        .ok()
        .and_then(|d| at.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Linear interpolation between closest ranks over an ascending sample.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
