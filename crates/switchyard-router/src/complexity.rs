// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic complexity scoring.
//!
//! Combines surface signals from the request text with its intent and the
//! size of any referenced artifact (an attached document) into a tier.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use switchyard_core::{ComplexityTier, HeuristicEstimator, Intent, TokenEstimator};
use switchyard_cost::estimate_resources;

use crate::classifier::ClassificationResult;

/// Derived complexity of one request. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexityScore {
    pub tier: ComplexityTier,
    /// Raw heuristic score the tier was derived from.
    pub score: i32,
    /// Request text plus referenced artifact, in tokens.
    pub estimated_input_tokens: u64,
    pub estimated_output_tokens: u64,
    pub reason: String,
}

const SIMPLE_KEYWORDS: &[&str] = &["get", "read", "show", "list", "count", "check", "display"];

const COMPLEX_KEYWORDS: &[&str] = &[
    "analyze", "analyse", "optimize", "design", "architect", "architecture", "refactor",
    "implement", "evaluate", "compare", "debug", "migrate", "comprehensive", "algorithm",
    "step by step", "in depth", "in detail", "end to end",
];

const MULTI_STEP_MARKERS: &[&str] = &[
    "then", "after that", "afterwards", "followed by", "and also", "finally", "next",
];

/// Word count above which a request is at least moderately involved.
const LONG_REQUEST_WORDS: usize = 15;
const VERY_LONG_REQUEST_WORDS: usize = 30;
/// Requests at most this long with a simple verb lean simple.
const SHORT_REQUEST_WORDS: usize = 10;

/// Referenced-artifact size thresholds in tokens, with their score.
const ARTIFACT_STEPS: &[(u64, i32)] = &[(100_000, 3), (32_000, 2), (8_000, 1)];

/// Maps request text and intent to a [`ComplexityScore`].
pub struct ComplexityAnalyzer {
    estimator: Arc<dyn TokenEstimator>,
}

impl fmt::Debug for ComplexityAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplexityAnalyzer")
            .field("estimator", &self.estimator)
            .finish()
    }
}

impl Default for ComplexityAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(HeuristicEstimator))
    }
}

impl ComplexityAnalyzer {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }

    /// Score a request with no referenced artifact.
    pub fn analyze(&self, text: &str, classification: &ClassificationResult) -> ComplexityScore {
        self.analyze_with_artifacts(text, classification, 0)
    }

    /// Score a request that references `referenced_tokens` of attached content.
    ///
    /// Monotonic in `referenced_tokens`: more referenced content never
    /// yields a lower tier.
    pub fn analyze_with_artifacts(
        &self,
        text: &str,
        classification: &ClassificationResult,
        referenced_tokens: u64,
    ) -> ComplexityScore {
        let lower = text.to_lowercase();
        let padded = format!(" {} ", lower.split_whitespace().collect::<Vec<_>>().join(" "));
        let has = |needle: &str| padded.contains(&format!(" {needle} "));
        let word_count = lower.split_whitespace().count();

        let mut score = 0;
        let mut signals: Vec<&str> = Vec::new();

        if word_count > VERY_LONG_REQUEST_WORDS {
            score += 2;
            signals.push("very long request");
        } else if word_count > LONG_REQUEST_WORDS {
            score += 1;
            signals.push("long request");
        }

        if COMPLEX_KEYWORDS.iter().any(|k| has(k)) {
            score += 2;
            signals.push("complex task keyword");
        } else if word_count < SHORT_REQUEST_WORDS && SIMPLE_KEYWORDS.iter().any(|k| has(k)) {
            score -= 1;
            signals.push("short lookup");
        }

        if MULTI_STEP_MARKERS.iter().any(|m| has(m)) || lower.matches(',').count() > 2 {
            score += 1;
            signals.push("multiple steps");
        }

        if text.contains("```") {
            score += 1;
            signals.push("code block");
        }

        if classification.intent == Intent::Analyze {
            score += 1;
            signals.push("analysis intent");
        }

        if let Some((_, bump)) = ARTIFACT_STEPS.iter().find(|(min, _)| referenced_tokens >= *min) {
            score += bump;
            signals.push("large referenced content");
        }

        let tier = tier_for_score(score);
        let estimated_input_tokens = self.estimator.estimate(text) as u64 + referenced_tokens;
        let estimated_output_tokens = estimate_resources(tier).expected_output_tokens;

        let reason = if signals.is_empty() {
            "no complexity signals".to_string()
        } else {
            signals.join(", ")
        };

        ComplexityScore {
            tier,
            score,
            estimated_input_tokens,
            estimated_output_tokens,
            reason,
        }
    }
}

fn tier_for_score(score: i32) -> ComplexityTier {
    match score {
        i32::MIN..=0 => ComplexityTier::Simple,
        1..=2 => ComplexityTier::Moderate,
        _ => ComplexityTier::Complex,
    }
}
