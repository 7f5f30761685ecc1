// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification, scoring, and ranking without execution.

use std::sync::Arc;

use serde::Serialize;
use switchyard_config::model::RoutingConfig;
use switchyard_core::{ComplexityTier, RequestOptions, SwitchyardError};
use switchyard_cost::{ResourceEstimate, estimate_resources};

use crate::classifier::{ClassificationResult, IntentClassifier};
use crate::complexity::{ComplexityAnalyzer, ComplexityScore};
use crate::selector::{ModelSelector, PlannedCandidate, SelectionConstraints};

impl SelectionConstraints {
    /// Constraints for a request whose size has been scored.
    pub fn for_request(options: &RequestOptions, score: &ComplexityScore) -> Self {
        Self {
            preferred_models: options.preferred_models.clone(),
            max_cost: options.max_cost,
            max_latency_ms: options.max_latency_ms,
            estimated_input_tokens: score.estimated_input_tokens,
            estimated_output_tokens: score.estimated_output_tokens,
        }
    }

    /// Constraints using the configured token assumptions, for ranking a tier
    /// with no request in hand.
    pub fn from_routing_defaults(routing: &RoutingConfig) -> Self {
        Self {
            estimated_input_tokens: routing.expected_input_tokens,
            estimated_output_tokens: routing.expected_output_tokens,
            ..Default::default()
        }
    }
}

/// What routing would do with a request.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingPlan {
    pub classification: ClassificationResult,
    pub complexity: ComplexityScore,
    pub resources: ResourceEstimate,
    /// Ranked fallback chain, first entry tried first.
    pub chain: Vec<PlannedCandidate>,
    /// First candidate in the chain whose circuit currently admits calls.
    pub recommended_backend: Option<String>,
    pub estimated_cost: Option<f64>,
}

/// Runs the pure routing stages: classify, score, rank.
#[derive(Debug)]
pub struct RequestPlanner {
    classifier: IntentClassifier,
    analyzer: ComplexityAnalyzer,
    selector: Arc<ModelSelector>,
}

impl RequestPlanner {
    pub fn new(analyzer: ComplexityAnalyzer, selector: Arc<ModelSelector>) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            analyzer,
            selector,
        }
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        self.classifier.classify(text)
    }

    pub fn score(
        &self,
        text: &str,
        classification: &ClassificationResult,
        referenced_tokens: u64,
    ) -> ComplexityScore {
        self.analyzer
            .analyze_with_artifacts(text, classification, referenced_tokens)
    }

    pub fn selector(&self) -> &Arc<ModelSelector> {
        &self.selector
    }

    /// Rank the chain for an already classified and scored request.
    pub fn plan_scored(
        &self,
        classification: ClassificationResult,
        complexity: ComplexityScore,
        constraints: &SelectionConstraints,
    ) -> Result<RoutingPlan, SwitchyardError> {
        let chain = self.selector.plan(complexity.tier, constraints)?;
        let recommended = chain.iter().find(|c| c.available);

        Ok(RoutingPlan {
            resources: estimate_resources(complexity.tier),
            recommended_backend: recommended.map(|c| c.backend.clone()),
            estimated_cost: recommended.map(|c| c.estimated_cost),
            classification,
            complexity,
            chain,
        })
    }

    /// Ranking report for a tier using the configured token assumptions.
    pub fn plan_tier(
        &self,
        tier: ComplexityTier,
        routing: &RoutingConfig,
    ) -> Result<Vec<PlannedCandidate>, SwitchyardError> {
        self.selector
            .plan(tier, &SelectionConstraints::from_routing_defaults(routing))
    }
}
