// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the routing pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Context key under which a request carries document content.
pub const DOCUMENT_CONTEXT_KEY: &str = "document";

/// Coarse category of what a request is asking for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Read,
    Write,
    Search,
    Analyze,
    Manage,
}

impl Intent {
    /// Every intent, in declaration order.
    pub const ALL: [Intent; 5] = [
        Intent::Read,
        Intent::Write,
        Intent::Search,
        Intent::Analyze,
        Intent::Manage,
    ];
}

/// Complexity tier that decides which candidates are eligible for a request.
///
/// Ordering follows cost: `Simple < Moderate < Complex`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityTier {
    pub const ALL: [ComplexityTier; 3] = [
        ComplexityTier::Simple,
        ComplexityTier::Moderate,
        ComplexityTier::Complex,
    ];
}

/// Summarization strategy applied to oversized documents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStrategy {
    /// Summarize each chunk, then summarize the concatenated summaries.
    Hierarchical,
    /// Group topically similar chunks and summarize each group separately.
    Semantic,
    /// Keep the chunks most relevant to the request verbatim.
    Extractive,
    /// Extractive narrowing followed by hierarchical reduction.
    Hybrid,
}

/// Token counts reported by a backend for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        u64::from(self.input_tokens) + u64::from(self.output_tokens)
    }
}

/// Caller-supplied routing constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// When non-empty, only these candidates are eligible.
    pub preferred_models: Vec<String>,
    /// Ceiling on the estimated cost of a single call, in USD.
    pub max_cost: Option<f64>,
    /// Ceiling on a candidate's declared average latency.
    pub max_latency_ms: Option<u64>,
    /// Overall deadline for execution including fallbacks.
    pub deadline: Option<Duration>,
    /// Summarization strategy for oversized documents.
    pub strategy: Option<SummaryStrategy>,
}

/// A free-text task request. Immutable once received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationRequest {
    pub text: String,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub options: RequestOptions,
}

impl OrchestrationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_document(self, document: impl Into<String>) -> Self {
        self.with_context(DOCUMENT_CONTEXT_KEY, serde_json::Value::String(document.into()))
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Document content carried in the context, if any.
    pub fn document(&self) -> Option<&str> {
        self.context
            .get(DOCUMENT_CONTEXT_KEY)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// One completed request, appended to the metrics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub timestamp: DateTime<Utc>,
    pub intent: Intent,
    pub tier: ComplexityTier,
    /// Backend that produced the result; `None` when nothing succeeded.
    pub backend: Option<String>,
    pub usage: TokenUsage,
    pub tokens_saved: u64,
    pub cost_usd: f64,
    pub duration: Duration,
    pub success: bool,
    /// Failed attempts before the outcome.
    pub fallback_depth: u32,
    pub preprocessed: bool,
    pub cache_hit: bool,
}
