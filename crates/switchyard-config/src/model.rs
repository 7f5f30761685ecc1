// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Switchyard routing pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use switchyard_core::types::{ComplexityTier, SummaryStrategy};

/// Top-level Switchyard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchyardConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Catalog of selectable model backends.
    #[serde(default = "default_models")]
    pub models: Vec<ModelCandidate>,

    /// Per-tier candidate lists.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Per-backend failure isolation.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Document chunking limits.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Summary cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Document preprocessing settings.
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,

    /// Metrics event log settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for SwitchyardConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            models: default_models(),
            routing: RoutingConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            chunking: ChunkingConfig::default(),
            cache: CacheConfig::default(),
            preprocessing: PreprocessingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl SwitchyardConfig {
    /// Look up a catalog entry by identifier.
    pub fn model(&self, id: &str) -> Option<&ModelCandidate> {
        self.models.iter().find(|m| m.id == id)
    }
}

/// Service identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Overall execution deadline when a request does not set one.
    #[serde(default = "default_deadline_secs")]
    pub default_deadline_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            default_deadline_secs: default_deadline_secs(),
        }
    }
}

fn default_service_name() -> String {
    "switchyard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_deadline_secs() -> u64 {
    60
}

/// One selectable model backend.
///
/// Costs are USD per 1,000 tokens.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelCandidate {
    pub id: String,

    #[serde(default)]
    pub input_cost_per_1k: f64,

    #[serde(default)]
    pub output_cost_per_1k: f64,

    /// Maximum tokens the backend accepts in one call.
    pub context_window: u64,

    #[serde(default = "default_average_latency_ms")]
    pub average_latency_ms: u64,

    /// Observed success ratio in `[0, 1]`, used only for value ranking.
    #[serde(default = "default_reliability")]
    pub reliability: f64,
}

impl ModelCandidate {
    pub fn new(id: &str, input_cost_per_1k: f64, output_cost_per_1k: f64, context_window: u64) -> Self {
        Self {
            id: id.to_string(),
            input_cost_per_1k,
            output_cost_per_1k,
            context_window,
            average_latency_ms: default_average_latency_ms(),
            reliability: default_reliability(),
        }
    }

    fn with_profile(mut self, average_latency_ms: u64, reliability: f64) -> Self {
        self.average_latency_ms = average_latency_ms;
        self.reliability = reliability;
        self
    }
}

fn default_average_latency_ms() -> u64 {
    1000
}

fn default_reliability() -> f64 {
    0.95
}

fn default_models() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::new("gpt-4o", 0.005, 0.015, 128_000).with_profile(3000, 0.98),
        ModelCandidate::new("gpt-4o-mini", 0.00015, 0.0006, 128_000).with_profile(2000, 0.97),
        ModelCandidate::new("gpt-3.5-turbo", 0.0005, 0.0015, 16_385).with_profile(1000, 0.95),
        ModelCandidate::new("o3", 0.015, 0.06, 200_000).with_profile(5000, 0.99),
        ModelCandidate::new("o3-mini", 0.003, 0.012, 200_000).with_profile(3000, 0.97),
        ModelCandidate::new("gemini-2.0-flash", 0.0, 0.0, 1_000_000).with_profile(800, 0.94),
        ModelCandidate::new("gemini-2.5-flash", 0.0001, 0.0003, 1_000_000).with_profile(700, 0.95),
        ModelCandidate::new("gemini-2.5-pro", 0.00125, 0.005, 1_000_000).with_profile(2000, 0.97),
        ModelCandidate::new("claude-3-opus", 0.015, 0.075, 200_000).with_profile(4000, 0.98),
        ModelCandidate::new("claude-3-sonnet", 0.003, 0.015, 200_000).with_profile(2500, 0.97),
        ModelCandidate::new("claude-3-haiku", 0.00025, 0.00125, 200_000).with_profile(1200, 0.95),
    ]
}

/// A candidate's membership in a tier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TierEntry {
    /// Identifier of a `[[models]]` entry.
    pub model: String,

    /// Lower values are tried first.
    pub priority: u32,
}

impl TierEntry {
    pub fn new(model: &str, priority: u32) -> Self {
        Self {
            model: model.to_string(),
            priority,
        }
    }
}

/// Model routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// High-cost model that savings are reported against.
    #[serde(default = "default_baseline_model")]
    pub baseline_model: String,

    /// Input tokens assumed by the cost filter when a request has no estimate.
    #[serde(default = "default_expected_input_tokens")]
    pub expected_input_tokens: u64,

    /// Output tokens assumed by the cost filter when a request has no estimate.
    #[serde(default = "default_expected_output_tokens")]
    pub expected_output_tokens: u64,

    #[serde(default = "default_simple_tier")]
    pub simple: Vec<TierEntry>,

    #[serde(default = "default_moderate_tier")]
    pub moderate: Vec<TierEntry>,

    #[serde(default = "default_complex_tier")]
    pub complex: Vec<TierEntry>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            baseline_model: default_baseline_model(),
            expected_input_tokens: default_expected_input_tokens(),
            expected_output_tokens: default_expected_output_tokens(),
            simple: default_simple_tier(),
            moderate: default_moderate_tier(),
            complex: default_complex_tier(),
        }
    }
}

impl RoutingConfig {
    /// Configured entries for `tier`, in declaration order.
    pub fn tier(&self, tier: ComplexityTier) -> &[TierEntry] {
        match tier {
            ComplexityTier::Simple => &self.simple,
            ComplexityTier::Moderate => &self.moderate,
            ComplexityTier::Complex => &self.complex,
        }
    }
}

fn default_simple_tier() -> Vec<TierEntry> {
    vec![
        TierEntry::new("gemini-2.0-flash", 1),
        TierEntry::new("gpt-3.5-turbo", 2),
        TierEntry::new("claude-3-haiku", 3),
    ]
}

fn default_moderate_tier() -> Vec<TierEntry> {
    vec![
        TierEntry::new("gpt-4o-mini", 1),
        TierEntry::new("gemini-2.5-pro", 2),
        TierEntry::new("claude-3-sonnet", 3),
    ]
}

fn default_complex_tier() -> Vec<TierEntry> {
    vec![
        TierEntry::new("gpt-4o", 1),
        TierEntry::new("claude-3-opus", 2),
        TierEntry::new("o3", 3),
    ]
}

fn default_baseline_model() -> String {
    "gpt-4o".to_string()
}

fn default_expected_input_tokens() -> u64 {
    1000
}

fn default_expected_output_tokens() -> u64 {
    500
}

/// Circuit breaker thresholds, shared by every backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Trailing window the consecutive failures must fall within.
    #[serde(default = "default_failure_window_secs")]
    pub failure_window_secs: u64,

    /// Time after the last failure before a half-open trial is permitted.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            failure_window_secs: default_failure_window_secs(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_failure_window_secs() -> u64 {
    60
}

fn default_cooldown_secs() -> u64 {
    30
}

/// Chunk size limits, in tokens.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_tokens")]
    pub default_chunk_tokens: usize,

    #[serde(default = "default_min_chunk_tokens")]
    pub min_chunk_tokens: usize,

    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,

    /// Tokens shared between consecutive chunks.
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            default_chunk_tokens: default_chunk_tokens(),
            min_chunk_tokens: default_min_chunk_tokens(),
            max_chunk_tokens: default_max_chunk_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

fn default_chunk_tokens() -> usize {
    10_000
}

fn default_min_chunk_tokens() -> usize {
    500
}

fn default_max_chunk_tokens() -> usize {
    50_000
}

fn default_overlap_tokens() -> usize {
    200
}

/// Where summaries are cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Summary cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Lifetime of a cached summary.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Capacity of the in-memory store; the oldest entry is evicted first.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// SQLite file used when `backend = "sqlite"`.
    #[serde(default = "default_cache_database_path")]
    pub database_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
            database_path: default_cache_database_path(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_cache_max_entries() -> usize {
    100
}

fn default_cache_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("switchyard").join("summaries.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("./switchyard-summaries.db"))
        .to_string_lossy()
        .to_string()
}

/// Token counting method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Four characters per token.
    #[default]
    Heuristic,
    /// cl100k BPE vocabulary.
    Cl100k,
}

/// Document preprocessing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fraction of the target context window a document may fill unprocessed.
    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,

    #[serde(default = "default_strategy")]
    pub default_strategy: SummaryStrategy,

    /// Backend used for summarization calls.
    #[serde(default = "default_summarizer_model")]
    pub summarizer_model: String,

    /// Output cap for a single summarization call.
    #[serde(default = "default_summary_max_output_tokens")]
    pub summary_max_output_tokens: u32,

    /// Concurrent chunk summarizations per document.
    #[serde(default = "default_max_parallel_summaries")]
    pub max_parallel_summaries: usize,

    /// Cosine similarity below which adjacent chunks start a new section.
    #[serde(default = "default_semantic_similarity_threshold")]
    pub semantic_similarity_threshold: f64,

    #[serde(default)]
    pub tokenizer: TokenizerKind,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            safety_margin: default_safety_margin(),
            default_strategy: default_strategy(),
            summarizer_model: default_summarizer_model(),
            summary_max_output_tokens: default_summary_max_output_tokens(),
            max_parallel_summaries: default_max_parallel_summaries(),
            semantic_similarity_threshold: default_semantic_similarity_threshold(),
            tokenizer: TokenizerKind::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_safety_margin() -> f64 {
    0.9
}

fn default_strategy() -> SummaryStrategy {
    SummaryStrategy::Hybrid
}

fn default_summarizer_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_summary_max_output_tokens() -> u32 {
    4096
}

fn default_max_parallel_summaries() -> usize {
    4
}

fn default_semantic_similarity_threshold() -> f64 {
    0.2
}

/// Metrics event log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Events older than this are pruned; must cover the longest query period.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Hard cap on retained events, bounding memory independently of
    /// traffic. Reaching it evicts the oldest events even when they are still
    /// inside the retention window, which is logged and counted.
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            max_events: default_max_events(),
        }
    }
}

fn default_retention_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_events() -> usize {
    1_000_000
}
