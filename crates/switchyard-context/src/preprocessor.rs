// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fits oversized documents into a target backend's context budget.
//!
//! A document needs preprocessing when its estimated size exceeds the target's
//! context window times the safety margin. Preprocessing is cached per
//! (content, strategy, target) and collapses concurrent work on the same key
//! to one computation: later callers wait on a per-key lock and then re-read
//! the cache. Waiting and summarizing both count against the request deadline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use switchyard_config::model::{ModelCandidate, SwitchyardConfig, TokenizerKind};
use switchyard_core::{
    HeuristicEstimator, SummaryStrategy, SwitchyardError, TiktokenEstimator, TokenEstimator,
};
use switchyard_metrics::record_cache_lookup;
use switchyard_resilience::{Deadline, run_with_deadline};

use crate::cache::{CacheKey, SummaryCache};
use crate::chunking::ChunkingEngine;
use crate::strategy::{StrategyContext, Summarizer, apply_strategy};

/// Estimator selected by `[preprocessing].tokenizer`.
pub fn build_estimator(kind: TokenizerKind) -> Result<Arc<dyn TokenEstimator>, SwitchyardError> {
    Ok(match kind {
        TokenizerKind::Heuristic => Arc::new(HeuristicEstimator),
        TokenizerKind::Cl100k => Arc::new(TiktokenEstimator::cl100k()?),
    })
}

/// Outcome of the size check against one target backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreprocessDecision {
    pub needed: bool,
    pub estimated_tokens: usize,
    /// Largest document, in tokens, the target accepts unprocessed.
    pub budget_tokens: usize,
}

/// A document reduced to fit its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessedDocument {
    pub summary: String,
    pub original_tokens: usize,
    pub summary_tokens: usize,
    pub strategy: SummaryStrategy,
    pub cache_hit: bool,
    /// Chunks produced by this call; zero when served from cache.
    pub chunk_count: usize,
    pub cache_key: String,
}

impl PreprocessedDocument {
    pub fn tokens_saved(&self) -> u64 {
        self.original_tokens.saturating_sub(self.summary_tokens) as u64
    }
}

#[derive(Debug, Clone)]
struct Settings {
    enabled: bool,
    safety_margin: f64,
    default_strategy: SummaryStrategy,
    ttl: Duration,
    max_output_tokens: u32,
    max_parallel: usize,
    similarity_threshold: f64,
}

/// One preprocessing call's inputs besides the content.
struct Scope<'a> {
    request_context: &'a str,
    strategy: SummaryStrategy,
    target: &'a ModelCandidate,
    key: &'a CacheKey,
    original_tokens: usize,
    deadline: Deadline,
    cancel: &'a CancellationToken,
}

pub struct DocumentPreprocessor {
    chunker: ChunkingEngine,
    summarizer: Arc<dyn Summarizer>,
    cache: Arc<dyn SummaryCache>,
    estimator: Arc<dyn TokenEstimator>,
    settings: Settings,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl fmt::Debug for DocumentPreprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPreprocessor")
            .field("chunker", &self.chunker)
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl DocumentPreprocessor {
    pub fn new(
        config: &SwitchyardConfig,
        estimator: Arc<dyn TokenEstimator>,
        summarizer: Arc<dyn Summarizer>,
        cache: Arc<dyn SummaryCache>,
    ) -> Self {
        let pre = &config.preprocessing;
        Self {
            chunker: ChunkingEngine::new(&config.chunking, estimator.clone()),
            summarizer,
            cache,
            estimator,
            settings: Settings {
                enabled: pre.enabled,
                safety_margin: pre.safety_margin,
                default_strategy: pre.default_strategy,
                ttl: Duration::from_secs(config.cache.ttl_secs),
                max_output_tokens: pre.summary_max_output_tokens,
                max_parallel: pre.max_parallel_summaries,
                similarity_threshold: pre.semantic_similarity_threshold,
            },
            in_flight: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<dyn SummaryCache> {
        &self.cache
    }

    pub fn estimator(&self) -> &Arc<dyn TokenEstimator> {
        &self.estimator
    }

    /// Token budget a document must fit for `target`.
    pub fn budget_tokens(&self, target: &ModelCandidate) -> usize {
        (target.context_window as f64 * self.settings.safety_margin).floor() as usize
    }

    pub fn should_preprocess(&self, content: &str, target: &ModelCandidate) -> PreprocessDecision {
        let estimated_tokens = self.estimator.estimate(content);
        let budget_tokens = self.budget_tokens(target);
        PreprocessDecision {
            needed: self.settings.enabled && estimated_tokens > budget_tokens,
            estimated_tokens,
            budget_tokens,
        }
    }

    /// Summarize `content` for `target`, focused on `request_context`.
    ///
    /// `strategy` falls back to the configured default. A failed strategy
    /// surfaces as `Preprocessing` and leaves nothing in the cache. Once
    /// `deadline` passes or `cancel` fires the call ends with `Timeout` or
    /// `Cancelled`.
    pub async fn preprocess(
        &self,
        content: &str,
        request_context: &str,
        strategy: Option<SummaryStrategy>,
        target: &ModelCandidate,
        deadline: Deadline,
        cancel: &CancellationToken,
    ) -> Result<PreprocessedDocument, SwitchyardError> {
        let strategy = strategy.unwrap_or(self.settings.default_strategy);
        let key = CacheKey::derive(content, strategy, &target.id);
        let original_tokens = self.estimator.estimate(content);

        if let Some(summary) = self.lookup(&key).await {
            return Ok(self.served(summary, original_tokens, strategy, &key));
        }

        let gate = self
            .in_flight
            .entry(key.as_str().to_string())
            .or_default()
            .clone();
        let result = {
            let turn = run_with_deadline(deadline, cancel, async {
                Ok::<_, SwitchyardError>(gate.lock().await)
            })
            .await;
            match turn {
                Ok(_turn) => {
                    let scope = Scope {
                        request_context,
                        strategy,
                        target,
                        key: &key,
                        original_tokens,
                        deadline,
                        cancel,
                    };
                    self.compute_once(content, scope).await
                }
                Err(e) => Err(e),
            }
        };
        drop(gate);
        self.in_flight
            .remove_if(key.as_str(), |_, g| Arc::strong_count(g) == 1);
        result
    }

    async fn compute_once(
        &self,
        content: &str,
        scope: Scope<'_>,
    ) -> Result<PreprocessedDocument, SwitchyardError> {
        let Scope {
            request_context,
            strategy,
            target,
            key,
            original_tokens,
            deadline,
            cancel,
        } = scope;

        // A caller that held the lock before us may have stored the result.
        if let Some(summary) = self.lookup(key).await {
            return Ok(self.served(summary, original_tokens, strategy, key));
        }

        let chunks = self.chunker.chunk(content);
        let budget_tokens = self.budget_tokens(target);
        let ctx = StrategyContext {
            summarizer: self.summarizer.as_ref(),
            estimator: self.estimator.as_ref(),
            budget_tokens,
            max_output_tokens: self.settings.max_output_tokens,
            max_parallel: self.settings.max_parallel,
            similarity_threshold: self.settings.similarity_threshold,
            deadline,
            cancel,
        };
        let summary = apply_strategy(strategy, &chunks, request_context, ctx).await?;

        if let Err(e) = self.cache.put(key, &summary, self.settings.ttl).await {
            warn!(key = %key, error = %e, "failed to store summary");
        }

        let summary_tokens = self.estimator.estimate(&summary);
        info!(
            target = %target.id,
            %strategy,
            original_tokens,
            summary_tokens,
            chunks = chunks.len(),
            "document preprocessed"
        );
        Ok(PreprocessedDocument {
            summary,
            original_tokens,
            summary_tokens,
            strategy,
            cache_hit: false,
            chunk_count: chunks.len(),
            cache_key: key.to_string(),
        })
    }

    /// Cached summary for `key`. Unreadable entries are dropped and storage
    /// errors degrade to a miss.
    async fn lookup(&self, key: &CacheKey) -> Option<String> {
        match self.cache.get(key).await {
            Ok(Some(summary)) => {
                record_cache_lookup("hit");
                debug!(key = %key, "summary cache hit");
                Some(summary)
            }
            Ok(None) => {
                record_cache_lookup("miss");
                None
            }
            Err(SwitchyardError::CacheCorruption { message, .. }) => {
                record_cache_lookup("corrupt");
                warn!(key = %key, %message, "corrupt summary cache entry, recomputing");
                if let Err(e) = self.cache.invalidate(key).await {
                    warn!(key = %key, error = %e, "failed to drop corrupt summary");
                }
                None
            }
            Err(e) => {
                record_cache_lookup("error");
                warn!(key = %key, error = %e, "summary cache unavailable");
                None
            }
        }
    }

    fn served(
        &self,
        summary: String,
        original_tokens: usize,
        strategy: SummaryStrategy,
        key: &CacheKey,
    ) -> PreprocessedDocument {
        PreprocessedDocument {
            summary_tokens: self.estimator.estimate(&summary),
            summary,
            original_tokens,
            strategy,
            cache_hit: true,
            chunk_count: 0,
            cache_key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use proptest::prelude::*;
    use tracing_test::traced_test;

    use super::*;
    use crate::cache::{CacheStats, MemorySummaryCache};

    /// Keeps the leading characters that fit the output allowance.
    #[derive(Default)]
    struct Truncator {
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl Summarizer for Truncator {
        async fn summarize(
            &self,
            text: &str,
            _: &str,
            max: u32,
            _: tokio::time::Instant,
        ) -> Result<String, SwitchyardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(text.chars().take(max as usize * 4).collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl Summarizer for Failing {
        async fn summarize(
            &self,
            _: &str,
            _: &str,
            _: u32,
            _: tokio::time::Instant,
        ) -> Result<String, SwitchyardError> {
            Err(SwitchyardError::execution(
                "gemini-2.0-flash",
                "503 service unavailable",
            ))
        }
    }

    /// Returns one corrupt read, then behaves as an empty memory store.
    #[derive(Debug)]
    struct CorruptOnce {
        inner: MemorySummaryCache,
        tripped: AtomicUsize,
    }

    #[async_trait]
    impl SummaryCache for CorruptOnce {
        async fn get(&self, key: &CacheKey) -> Result<Option<String>, SwitchyardError> {
            if self.tripped.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(SwitchyardError::CacheCorruption {
                    key: key.to_string(),
                    message: "invalid created_at".into(),
                });
            }
            self.inner.get(key).await
        }
        async fn put(&self, key: &CacheKey, s: &str, ttl: Duration) -> Result<(), SwitchyardError> {
            self.inner.put(key, s, ttl).await
        }
        async fn invalidate(&self, key: &CacheKey) -> Result<bool, SwitchyardError> {
            self.inner.invalidate(key).await
        }
        async fn clear(&self) -> Result<(), SwitchyardError> {
            self.inner.clear().await
        }
        async fn stats(&self) -> Result<CacheStats, SwitchyardError> {
            self.inner.stats().await
        }
    }

    fn preprocessor(
        summarizer: Arc<dyn Summarizer>,
        cache: Arc<dyn SummaryCache>,
    ) -> DocumentPreprocessor {
        let mut config = SwitchyardConfig::default();
        config.preprocessing.default_strategy = SummaryStrategy::Hierarchical;
        DocumentPreprocessor::new(&config, Arc::new(HeuristicEstimator), summarizer, cache)
    }

    static LIVE: LazyLock<CancellationToken> = LazyLock::new(CancellationToken::new);

    fn later() -> Deadline {
        Deadline::after(Duration::from_secs(60))
    }

    fn memory() -> Arc<dyn SummaryCache> {
        Arc::new(MemorySummaryCache::new(16))
    }

    fn target(context_window: u64) -> ModelCandidate {
        ModelCandidate::new("gpt-4o", 0.005, 0.015, context_window)
    }

    #[test]
    fn threshold_is_context_window_times_margin() {
        let p = preprocessor(Arc::new(Truncator::default()), memory());
        let t = target(128_000);

        let fits = "a".repeat(115_200 * 4);
        let d = p.should_preprocess(&fits, &t);
        assert_eq!(d.budget_tokens, 115_200);
        assert_eq!(d.estimated_tokens, 115_200);
        assert!(!d.needed);

        let over = "a".repeat(115_200 * 4 + 1);
        assert!(p.should_preprocess(&over, &t).needed);
    }

    #[test]
    fn disabled_preprocessing_is_never_needed() {
        let mut config = SwitchyardConfig::default();
        config.preprocessing.enabled = false;
        let p = DocumentPreprocessor::new(
            &config,
            Arc::new(HeuristicEstimator),
            Arc::new(Truncator::default()),
            memory(),
        );
        assert!(
            !p.should_preprocess(&"a".repeat(10_000), &target(100))
                .needed
        );
    }

    proptest! {
        #[test]
        fn content_within_budget_is_left_alone(chars in 0usize..8_000, window in 1u64..2_000) {
            let p = preprocessor(Arc::new(Truncator::default()), memory());
            let t = target(window);
            let d = p.should_preprocess(&"x".repeat(chars), &t);
            let budget = (window as f64 * 0.9).floor() as usize;
            prop_assert_eq!(d.budget_tokens, budget);
            prop_assert_eq!(d.needed, chars.div_ceil(4) > budget);
        }
    }

    #[tokio::test]
    async fn half_million_token_document_fits_128k_target() {
        let summarizer = Arc::new(Truncator::default());
        let mut config = SwitchyardConfig::default();
        config.preprocessing.default_strategy = SummaryStrategy::Hybrid;
        let p = DocumentPreprocessor::new(
            &config,
            Arc::new(HeuristicEstimator),
            summarizer.clone(),
            memory(),
        );
        let content = "The quarterly report covers revenue, churn and hiring.\n".repeat(36_364);
        let t = target(128_000);

        let decision = p.should_preprocess(&content, &t);
        assert!(decision.needed);
        assert!(decision.estimated_tokens >= 500_000);

        let doc = p
            .preprocess(
                &content,
                "summarize revenue trends",
                None,
                &t,
                later(),
                &LIVE,
            )
            .await
            .unwrap();
        assert!(doc.summary_tokens <= 115_200);
        assert!(!doc.summary.is_empty());
        assert!(!doc.cache_hit);
        assert!(doc.chunk_count > 1);
        assert!(doc.tokens_saved() > 0);
        assert_eq!(doc.strategy, SummaryStrategy::Hybrid);
    }

    #[tokio::test]
    async fn repeated_call_is_served_from_cache() {
        let summarizer = Arc::new(Truncator::default());
        let p = preprocessor(summarizer.clone(), memory());
        let content = "section one\n".repeat(20_000);
        let t = target(8_000);

        let first = p
            .preprocess(&content, "ctx", None, &t, later(), &LIVE)
            .await
            .unwrap();
        let calls = summarizer.calls.load(Ordering::SeqCst);
        assert!(calls > 0);

        let second = p
            .preprocess(&content, "ctx", None, &t, later(), &LIVE)
            .await
            .unwrap();
        assert_eq!(second.summary, first.summary);
        assert_eq!(second.cache_key, first.cache_key);
        assert!(second.cache_hit);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_identical_requests_compute_once() {
        let content = "section one\n".repeat(20_000);
        let t = target(8_000);

        let baseline = Arc::new(Truncator::default());
        preprocessor(baseline.clone(), memory())
            .preprocess(&content, "ctx", None, &t, later(), &LIVE)
            .await
            .unwrap();
        let single_run = baseline.calls.load(Ordering::SeqCst);

        let summarizer = Arc::new(Truncator {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let p = preprocessor(summarizer.clone(), memory());
        let results = futures::future::join_all(
            (0..8).map(|_| p.preprocess(&content, "ctx", None, &t, later(), &LIVE)),
        )
        .await;

        let summaries: Vec<String> = results.into_iter().map(|r| r.unwrap().summary).collect();
        assert!(summaries.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), single_run);
        assert!(p.in_flight.is_empty());
    }

    #[tokio::test]
    async fn strategy_failure_is_surfaced_and_not_cached() {
        let cache = memory();
        let p = preprocessor(Arc::new(Failing), cache.clone());
        let content = "body text\n".repeat(10_000);

        let err = p
            .preprocess(&content, "ctx", None, &target(4_000), later(), &LIVE)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::Preprocessing { .. }));
        assert!(err.to_string().contains("503"));
        assert_eq!(cache.stats().await.unwrap().entries, 0);
        assert!(p.in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_summarizer_is_bounded_by_the_request_deadline() {
        let summarizer = Arc::new(Truncator {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let cache = memory();
        let p = preprocessor(summarizer, cache.clone());
        let content = "body text\n".repeat(10_000);
        let t = target(4_000);

        let started = tokio::time::Instant::now();
        let first = p.preprocess(
            &content,
            "ctx",
            None,
            &t,
            Deadline::after(Duration::from_secs(2)),
            &LIVE,
        );
        let waiter = p.preprocess(
            &content,
            "ctx",
            None,
            &t,
            Deadline::after(Duration::from_secs(1)),
            &LIVE,
        );
        let (first, waiter) = tokio::join!(first, waiter);

        assert!(matches!(first, Err(SwitchyardError::Timeout { .. })));
        assert!(matches!(waiter, Err(SwitchyardError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(cache.stats().await.unwrap().entries, 0);
        assert!(p.in_flight.is_empty());
    }

    #[tokio::test]
    async fn cancelled_request_does_no_work() {
        let summarizer = Arc::new(Truncator::default());
        let p = preprocessor(summarizer.clone(), memory());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = p
            .preprocess(
                &"body text\n".repeat(10_000),
                "ctx",
                None,
                &target(4_000),
                later(),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::Cancelled));
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn corrupt_entry_is_recomputed() {
        let summarizer = Arc::new(Truncator::default());
        let cache = Arc::new(CorruptOnce {
            inner: MemorySummaryCache::new(16),
            tripped: AtomicUsize::new(0),
        });
        let p = preprocessor(summarizer.clone(), cache.clone());
        let content = "body text\n".repeat(10_000);

        let doc = p
            .preprocess(&content, "ctx", None, &target(4_000), later(), &LIVE)
            .await
            .unwrap();
        assert!(!doc.cache_hit);
        assert!(summarizer.calls.load(Ordering::SeqCst) > 0);
        assert!(logs_contain("corrupt summary cache entry"));
        assert_eq!(cache.stats().await.unwrap().entries, 1);
    }

    #[tokio::test]
    async fn strategy_is_part_of_the_key() {
        let p = preprocessor(Arc::new(Truncator::default()), memory());
        let content = "body text\n".repeat(10_000);
        let t = target(4_000);
        let a = p
            .preprocess(
                &content,
                "ctx",
                Some(SummaryStrategy::Hierarchical),
                &t,
                later(),
                &LIVE,
            )
            .await
            .unwrap();
        let b = p
            .preprocess(
                &content,
                "ctx",
                Some(SummaryStrategy::Extractive),
                &t,
                later(),
                &LIVE,
            )
            .await
            .unwrap();
        assert_ne!(a.cache_key, b.cache_key);
        assert!(!b.cache_hit);
    }

    #[test]
    fn heuristic_tokenizer_is_default() {
        let est = build_estimator(TokenizerKind::Heuristic).unwrap();
        assert_eq!(est.estimate("abcdefgh"), 2);
    }
}
