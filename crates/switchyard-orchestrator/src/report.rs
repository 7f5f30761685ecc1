// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Values returned to orchestrator callers.

use std::time::Duration;

use serde::Serialize;
use switchyard_context::{PreprocessDecision, PreprocessedDocument};
use switchyard_core::{ComplexityTier, Intent, SummaryStrategy, TokenUsage};
use switchyard_cost::ResourceEstimate;
use switchyard_router::{ClassificationResult, ComplexityScore, PlannedCandidate};

/// How a request's document was reduced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessingReport {
    /// Backend whose context window set the budget.
    pub target: String,
    pub strategy: SummaryStrategy,
    pub original_tokens: usize,
    pub summary_tokens: usize,
    pub cache_hit: bool,
    pub chunk_count: usize,
}

impl PreprocessingReport {
    pub(crate) fn new(target: &str, doc: &PreprocessedDocument) -> Self {
        Self {
            target: target.to_string(),
            strategy: doc.strategy,
            original_tokens: doc.original_tokens,
            summary_tokens: doc.summary_tokens,
            cache_hit: doc.cache_hit,
            chunk_count: doc.chunk_count,
        }
    }

    pub fn tokens_saved(&self) -> u64 {
        self.original_tokens.saturating_sub(self.summary_tokens) as u64
    }
}

/// A completed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationResult {
    pub output: String,
    pub backend: String,
    pub intent: Intent,
    pub confidence: f32,
    pub tier: ComplexityTier,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    /// Failed attempts before the backend that answered.
    pub fallback_depth: u32,
    /// Candidates passed over because their circuit was open.
    pub skipped: usize,
    pub duration: Duration,
    pub preprocessing: Option<PreprocessingReport>,
}

/// Routing analysis for a request, without execution.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub classification: ClassificationResult,
    pub complexity: ComplexityScore,
    pub resources: ResourceEstimate,
    pub recommended_backend: Option<String>,
    pub estimated_cost: Option<f64>,
    pub chain: Vec<PlannedCandidate>,
    /// Size check for the request's document, when it carries one.
    pub preprocessing: Option<PreprocessingPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessingPlan {
    pub target: String,
    #[serde(flatten)]
    pub decision: PreprocessDecision,
}
