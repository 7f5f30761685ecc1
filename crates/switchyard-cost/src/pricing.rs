// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate pricing and cost calculation.
//!
//! Catalog prices are USD per 1,000 tokens. Every cost in the pipeline goes
//! through these functions so the selector's cost filter, the reported cost
//! of a request, and the baseline comparison agree to the cent.

use switchyard_config::model::ModelCandidate;
use switchyard_core::TokenUsage;

/// Per-candidate pricing in USD per 1,000 tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl From<&ModelCandidate> for ModelPricing {
    fn from(candidate: &ModelCandidate) -> Self {
        Self {
            input_per_1k: candidate.input_cost_per_1k,
            output_per_1k: candidate.output_cost_per_1k,
        }
    }
}

impl ModelPricing {
    /// Cost in USD for the given token counts.
    pub fn cost_for(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// Cost in USD for the usage a backend reported.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    pricing.cost_for(
        u64::from(usage.input_tokens),
        u64::from(usage.output_tokens),
    )
}

/// Estimated cost in USD of sending `input_tokens` and receiving `output_tokens`.
pub fn estimate_cost(candidate: &ModelCandidate, input_tokens: u64, output_tokens: u64) -> f64 {
    ModelPricing::from(candidate).cost_for(input_tokens, output_tokens)
}

/// What `usage` would have cost on `baseline`, minus what it actually cost.
///
/// Negative when the selected backend is pricier than the baseline.
pub fn savings_against(baseline: &ModelPricing, usage: &TokenUsage, actual_cost: f64) -> f64 {
    calculate_cost(usage, baseline) - actual_cost
}
