// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tier resource expectations and value ranking.

use std::time::Duration;

use serde::Serialize;
use switchyard_config::model::ModelCandidate;
use switchyard_core::ComplexityTier;

/// What a request of a given tier typically consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceEstimate {
    pub expected_output_tokens: u64,
    pub expected_latency: Duration,
    pub recommended_timeout: Duration,
}

/// Typical consumption for `tier`.
pub fn estimate_resources(tier: ComplexityTier) -> ResourceEstimate {
    let (output, latency_ms, timeout_ms) = match tier {
        ComplexityTier::Simple => (500, 1_000, 5_000),
        ComplexityTier::Moderate => (2_000, 3_000, 15_000),
        ComplexityTier::Complex => (5_000, 10_000, 60_000),
    };
    ResourceEstimate {
        expected_output_tokens: output,
        expected_latency: Duration::from_millis(latency_ms),
        recommended_timeout: Duration::from_millis(timeout_ms),
    }
}

const COST_WEIGHT: f64 = 0.4;
const LATENCY_WEIGHT: f64 = 0.3;
const RELIABILITY_WEIGHT: f64 = 0.3;

/// Value score in `[0, 1]` of `candidate` relative to the most expensive and
/// slowest candidates it is compared against. Higher is better.
pub fn value_score(
    candidate: &ModelCandidate,
    estimated_cost: f64,
    max_cost: f64,
    max_latency_ms: u64,
) -> f64 {
    let cost_score = if max_cost > 0.0 {
        1.0 - (estimated_cost / max_cost).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let latency_score = if max_latency_ms > 0 {
        1.0 - (candidate.average_latency_ms as f64 / max_latency_ms as f64).clamp(0.0, 1.0)
    } else {
        1.0
    };
    COST_WEIGHT * cost_score
        + LATENCY_WEIGHT * latency_score
        + RELIABILITY_WEIGHT * candidate.reliability.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heavier_tiers_expect_more() {
        let simple = estimate_resources(ComplexityTier::Simple);
        let moderate = estimate_resources(ComplexityTier::Moderate);
        let complex = estimate_resources(ComplexityTier::Complex);
        assert!(simple.expected_output_tokens < moderate.expected_output_tokens);
        assert!(moderate.expected_output_tokens < complex.expected_output_tokens);
        assert!(simple.recommended_timeout < complex.recommended_timeout);
    }

    #[test]
    fn cheaper_faster_candidate_scores_higher() {
        let mut fast = ModelCandidate::new("fast", 0.0001, 0.0003, 100_000);
        fast.average_latency_ms = 500;
        let mut slow = ModelCandidate::new("slow", 0.01, 0.03, 100_000);
        slow.average_latency_ms = 4000;

        let fast_score = value_score(&fast, 0.0002, 0.02, 4000);
        let slow_score = value_score(&slow, 0.02, 0.02, 4000);
        assert!(fast_score > slow_score);
        assert!((0.0..=1.0).contains(&fast_score));
    }
}
