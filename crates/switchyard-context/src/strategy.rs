// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Summarization strategies over a chunked document.
//!
//! Every strategy shares one entry point, [`apply_strategy`], selected by the
//! [`SummaryStrategy`] discriminant. Strategies that need a language model go
//! through the [`Summarizer`] collaborator; extractive selection is local.
//! Each summarizer call runs under the request's deadline and cancellation
//! token.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use switchyard_core::{
    ExecutionRequest, ModelBackend, SummaryStrategy, SwitchyardError, TokenEstimator,
};
use switchyard_resilience::{Deadline, run_with_deadline};

use crate::chunking::DocumentChunk;

/// System prompt for every summarization call.
const SUMMARY_PROMPT: &str = r#"You are a document preprocessor. Condense the material below so that another model with a smaller context window can answer the user's request from your output alone.

PRESERVE:
- Facts, figures, names, and identifiers relevant to the request
- Definitions and key decisions
- Code, data structures, and exact quotes that the request depends on

OMIT:
- Boilerplate and repetition
- Sections unrelated to the request

Write plain prose or bullet points. Do not add commentary about the task."#;

/// Widening factor applied to the budget when hybrid narrows chunks before
/// reducing them.
const HYBRID_WIDEN: usize = 3;

/// Smallest per-call output allowance.
const MIN_CALL_TOKENS: usize = 64;

/// Produces a summary of text, focused on a request.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// `deadline` is the owning request's deadline; the caller also enforces it.
    async fn summarize(
        &self,
        text: &str,
        focus: &str,
        max_output_tokens: u32,
        deadline: Instant,
    ) -> Result<String, SwitchyardError>;
}

/// [`Summarizer`] backed by a model backend.
pub struct BackendSummarizer {
    backend: Arc<dyn ModelBackend>,
    model: String,
}

impl BackendSummarizer {
    pub fn new(backend: Arc<dyn ModelBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Summarizer for BackendSummarizer {
    async fn summarize(
        &self,
        text: &str,
        focus: &str,
        max_output_tokens: u32,
        deadline: Instant,
    ) -> Result<String, SwitchyardError> {
        let request = ExecutionRequest {
            backend_id: self.model.clone(),
            system_prompt: Some(SUMMARY_PROMPT.to_string()),
            prompt: format!("User's request: {focus}\n\nMaterial:\n\n{text}"),
            max_output_tokens,
            deadline,
        };
        let response = self.backend.execute(request).await?;

        debug!(
            model = %self.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "summary call complete"
        );
        Ok(response.output)
    }
}

/// Everything a strategy needs besides the chunks.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    pub summarizer: &'a dyn Summarizer,
    pub estimator: &'a dyn TokenEstimator,
    /// Upper bound on the summary, in tokens.
    pub budget_tokens: usize,
    /// Upper bound on a single summarizer call's output.
    pub max_output_tokens: u32,
    /// Summarizer calls allowed in flight at once.
    pub max_parallel: usize,
    /// Cosine similarity at or above which adjacent chunks share a section.
    pub similarity_threshold: f64,
    /// Deadline of the request that owns this document.
    pub deadline: Deadline,
    pub cancel: &'a CancellationToken,
}

/// Why a strategy stopped without a summary.
enum Halt {
    /// The request deadline passed or the request was cancelled.
    Interrupted(SwitchyardError),
    Failed {
        message: String,
        source: Option<SwitchyardError>,
    },
}

impl Halt {
    fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    fn into_error(self, strategy: SummaryStrategy) -> SwitchyardError {
        match self {
            Self::Interrupted(e) => e,
            Self::Failed { message, source } => SwitchyardError::Preprocessing {
                strategy,
                message,
                source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
            },
        }
    }
}

/// Reduce `chunks` to a summary focused on `request_context`.
///
/// Fails with `Preprocessing` when a summarizer call fails or the result does
/// not fit `budget_tokens`; raw content is never substituted. An expired
/// deadline or a cancelled token ends the work with `Timeout` or `Cancelled`.
pub async fn apply_strategy(
    strategy: SummaryStrategy,
    chunks: &[DocumentChunk],
    request_context: &str,
    ctx: StrategyContext<'_>,
) -> Result<String, SwitchyardError> {
    if chunks.is_empty() {
        return Ok(String::new());
    }

    let summary = match strategy {
        SummaryStrategy::Hierarchical => {
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            hierarchical(&texts, request_context, ctx).await
        }
        SummaryStrategy::Semantic => semantic(chunks, request_context, ctx).await,
        SummaryStrategy::Extractive => extractive(chunks, request_context, ctx.budget_tokens)
            .ok_or_else(|| Halt::failed("no section fits the token budget")),
        SummaryStrategy::Hybrid => {
            let widened = ctx.budget_tokens.saturating_mul(HYBRID_WIDEN);
            let selected = select_relevant(chunks, request_context, widened);
            if selected.is_empty() {
                Err(Halt::failed("no section fits the widened token budget"))
            } else {
                debug!(selected = selected.len(), total = chunks.len(), "hybrid narrowed chunks");
                let texts = dedupe_overlap(&selected);
                let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
                hierarchical(&texts, request_context, ctx).await
            }
        }
    }
    .map_err(|halt| halt.into_error(strategy))?;

    let tokens = ctx.estimator.estimate(&summary);
    if tokens > ctx.budget_tokens {
        return Err(SwitchyardError::Preprocessing {
            strategy,
            message: format!(
                "summary of {tokens} tokens exceeds budget of {} tokens",
                ctx.budget_tokens
            ),
            source: None,
        });
    }

    info!(
        %strategy,
        chunks = chunks.len(),
        summary_tokens = tokens,
        budget_tokens = ctx.budget_tokens,
        "document summarized"
    );
    Ok(summary)
}

fn call_limit(budget: usize, parts: usize, ctx: &StrategyContext<'_>) -> u32 {
    let share = (budget / parts.max(1)).max(MIN_CALL_TOKENS);
    u32::try_from(share)
        .unwrap_or(u32::MAX)
        .min(ctx.max_output_tokens)
}

/// One summarizer call bounded by the request deadline and cancel token.
async fn summarize_one(
    text: &str,
    focus: &str,
    limit: u32,
    stage: &str,
    ctx: StrategyContext<'_>,
) -> Result<String, Halt> {
    let call = async {
        Ok::<_, SwitchyardError>(ctx
            .summarizer
            .summarize(text, focus, limit, ctx.deadline.instant())
            .await)
    };
    match run_with_deadline(ctx.deadline, ctx.cancel, call).await {
        Ok(Ok(summary)) => Ok(summary),
        Ok(Err(e)) => Err(Halt::Failed {
            message: format!("summarizer call failed{stage}: {e}"),
            source: Some(e),
        }),
        Err(e) => Err(Halt::Interrupted(e)),
    }
}

async fn summarize_all(
    texts: &[&str],
    focus: &str,
    limit: u32,
    ctx: StrategyContext<'_>,
) -> Result<Vec<String>, Halt> {
    stream::iter(texts.iter().copied())
        .map(|text| summarize_one(text, focus, limit, "", ctx))
        .buffered(ctx.max_parallel.max(1))
        .try_collect()
        .await
}

/// Two-level reduction: summarize each part, then the joined summaries.
async fn hierarchical(
    texts: &[&str],
    focus: &str,
    ctx: StrategyContext<'_>,
) -> Result<String, Halt> {
    let final_limit = call_limit(ctx.budget_tokens, 1, &ctx);
    if let [only] = texts {
        return summarize_one(only, focus, final_limit, "", ctx).await;
    }

    let per_part = call_limit(ctx.budget_tokens, texts.len(), &ctx);
    let partials = summarize_all(texts, focus, per_part, ctx).await?;
    let joined = partials.join("\n\n");
    summarize_one(&joined, focus, final_limit, " on merge", ctx).await
}

/// Group adjacent, topically similar chunks and summarize each group on its
/// own so unrelated sections stay separate.
async fn semantic(
    chunks: &[DocumentChunk],
    focus: &str,
    ctx: StrategyContext<'_>,
) -> Result<String, Halt> {
    let groups = group_by_similarity(chunks, ctx.similarity_threshold);
    debug!(groups = groups.len(), chunks = chunks.len(), "semantic grouping");

    let texts: Vec<String> = groups
        .iter()
        .map(|group| {
            let members: Vec<&DocumentChunk> = group.iter().map(|&i| &chunks[i]).collect();
            dedupe_overlap(&members).concat()
        })
        .collect();
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();

    // Section headers cost a few tokens each.
    let header_allowance = groups.len() * 8;
    let limit = call_limit(
        ctx.budget_tokens.saturating_sub(header_allowance),
        groups.len(),
        &ctx,
    );
    let summaries = summarize_all(&texts, focus, limit, ctx).await?;

    Ok(summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("## Section {}\n{}", i + 1, s.trim()))
        .collect::<Vec<_>>()
        .join("\n\n"))
}

/// Verbatim chunks most relevant to `focus`, in document order, within budget.
fn extractive(chunks: &[DocumentChunk], focus: &str, budget_tokens: usize) -> Option<String> {
    let selected = select_relevant(chunks, focus, budget_tokens);
    if selected.is_empty() {
        return None;
    }
    Some(dedupe_overlap(&selected).concat())
}

/// Chunks ranked by relevance and taken greedily while they fit, returned in
/// document order.
fn select_relevant<'c>(
    chunks: &'c [DocumentChunk],
    focus: &str,
    budget_tokens: usize,
) -> Vec<&'c DocumentChunk> {
    let terms: HashSet<String> = terms(focus).into_iter().collect();

    let mut ranked: Vec<(usize, f64)> = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| (i, relevance(&c.text, &terms)))
        .collect();
    // Highest relevance first; earlier chunks win ties.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut used = 0usize;
    let mut keep: Vec<usize> = Vec::new();
    for (i, _) in ranked {
        let cost = chunks[i].estimated_tokens;
        if used + cost <= budget_tokens {
            used += cost;
            keep.push(i);
        }
    }
    keep.sort_unstable();
    keep.into_iter().map(|i| &chunks[i]).collect()
}

/// Chunk texts with the part already covered by the previous selected chunk
/// removed, so adjacent selections do not repeat the overlap.
fn dedupe_overlap(selected: &[&DocumentChunk]) -> Vec<String> {
    let mut out = Vec::with_capacity(selected.len());
    let mut covered_to: Option<usize> = None;
    for chunk in selected {
        let skip = match covered_to {
            Some(end) if end > chunk.start => end - chunk.start,
            Some(_) => {
                out.push("\n\n".to_string());
                0
            }
            None => 0,
        };
        out.push(chunk.text.chars().skip(skip).collect());
        covered_to = Some(chunk.end);
    }
    out
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "has", "have", "this",
    "that", "with", "from", "what", "which", "about", "into", "than", "then", "them", "they",
    "their", "there", "these", "those", "will", "would", "should", "could", "please", "does",
];

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Focus-term occurrences per 1,000 words.
fn relevance(text: &str, focus_terms: &HashSet<String>) -> f64 {
    if focus_terms.is_empty() {
        return 0.0;
    }
    let words = terms(text);
    if words.is_empty() {
        return 0.0;
    }
    let hits = words.iter().filter(|w| focus_terms.contains(*w)).count();
    hits as f64 * 1000.0 / words.len() as f64
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut tf = HashMap::new();
    for term in terms(text) {
        *tf.entry(term).or_insert(0.0) += 1.0;
    }
    tf
}

fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(k, va)| b.get(k).map(|vb| va * vb))
        .sum();
    let norm = |m: &HashMap<String, f64>| m.values().map(|v| v * v).sum::<f64>().sqrt();
    let denom = norm(a) * norm(b);
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Indices of adjacent chunks grouped while each chunk's term vector stays
/// within `threshold` of its predecessor's.
fn group_by_similarity(chunks: &[DocumentChunk], threshold: f64) -> Vec<Vec<usize>> {
    let vectors: Vec<_> = chunks.iter().map(|c| term_frequencies(&c.text)).collect();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..chunks.len() {
        match groups.last_mut() {
            Some(group) if cosine(&vectors[i - 1], &vectors[i]) >= threshold => group.push(i),
            _ => groups.push(vec![i]),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{LazyLock, Mutex};
    use std::time::Duration;

    use switchyard_config::model::ChunkingConfig;
    use switchyard_core::HeuristicEstimator;

    use super::*;
    use crate::chunking::ChunkingEngine;

    /// Returns the first `max_output_tokens * 4` characters of its input,
    /// prefixed with a marker.
    #[derive(Default)]
    struct Truncator {
        calls: AtomicUsize,
        limits: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl Summarizer for Truncator {
        async fn summarize(
            &self,
            text: &str,
            _focus: &str,
            max: u32,
            _: Instant,
        ) -> Result<String, SwitchyardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.limits.lock().unwrap().push(max);
            let keep = (max as usize * 4).saturating_sub(2);
            Ok(format!("S:{}", text.chars().take(keep).collect::<String>()))
        }
    }

    struct Failing;

    #[async_trait]
    impl Summarizer for Failing {
        async fn summarize(&self, _: &str, _: &str, _: u32, _: Instant) -> Result<String, SwitchyardError> {
            Err(SwitchyardError::execution("gemini-2.0-flash", "quota exhausted"))
        }
    }

    fn chunks(content: &str, chunk_tokens: usize) -> Vec<DocumentChunk> {
        ChunkingEngine::with_heuristic(&ChunkingConfig {
            default_chunk_tokens: chunk_tokens,
            min_chunk_tokens: 1,
            max_chunk_tokens: 1_000_000,
            overlap_tokens: 2,
        })
        .chunk(content)
    }

    /// Never answers; only the deadline or the token ends a call.
    struct Hanging;

    #[async_trait]
    impl Summarizer for Hanging {
        async fn summarize(&self, _: &str, _: &str, _: u32, _: Instant) -> Result<String, SwitchyardError> {
            std::future::pending().await
        }
    }

    static LIVE: LazyLock<CancellationToken> = LazyLock::new(CancellationToken::new);

    fn ctx<'a>(s: &'a dyn Summarizer, budget: usize) -> StrategyContext<'a> {
        StrategyContext {
            summarizer: s,
            estimator: &HeuristicEstimator,
            budget_tokens: budget,
            max_output_tokens: 4096,
            max_parallel: 4,
            similarity_threshold: 0.2,
            deadline: Deadline::after(Duration::from_secs(60)),
            cancel: &LIVE,
        }
    }

    #[tokio::test]
    async fn hierarchical_makes_one_call_per_chunk_plus_merge() {
        let s = Truncator::default();
        let parts = chunks(&"alpha beta gamma delta ".repeat(200), 100);
        let n = parts.len();
        assert!(n > 1);
        let out = apply_strategy(SummaryStrategy::Hierarchical, &parts, "greek", ctx(&s, 500))
            .await
            .unwrap();
        assert_eq!(s.calls.load(Ordering::SeqCst), n + 1);
        assert!(HeuristicEstimator.estimate(&out) <= 500);
        assert_eq!(*s.limits.lock().unwrap().last().unwrap(), 500);
    }

    #[tokio::test]
    async fn single_chunk_needs_one_call() {
        let s = Truncator::default();
        let parts = chunks("short document", 100);
        apply_strategy(SummaryStrategy::Hierarchical, &parts, "", ctx(&s, 500))
            .await
            .unwrap();
        assert_eq!(s.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn extractive_keeps_relevant_chunks_verbatim_in_order() {
        let s = Truncator::default();
        let content = format!(
            "{}\n{}\n{}\n",
            "cooking recipes and kitchen tips ".repeat(12),
            "database indexing improves query latency ".repeat(12),
            "gardening and flowers in spring ".repeat(12),
        );
        let parts = chunks(&content, 100);
        let budget = parts.iter().map(|c| c.estimated_tokens).max().unwrap() + 10;
        let out = apply_strategy(
            SummaryStrategy::Extractive,
            &parts,
            "why is my database query slow, check the indexing",
            ctx(&s, budget),
        )
        .await
        .unwrap();
        assert_eq!(s.calls.load(Ordering::SeqCst), 0);
        assert!(out.contains("database indexing"));
        assert!(content.contains(out.trim()));
    }

    #[test]
    fn extraction_dedupes_adjacent_overlap() {
        let content = "0123456789".repeat(20);
        let parts = chunks(&content, 10); // 40 chars, overlap 8
        let all: Vec<&DocumentChunk> = parts.iter().collect();
        assert_eq!(dedupe_overlap(&all).concat(), content);
    }

    #[test]
    fn extractive_without_room_selects_nothing() {
        let parts = chunks(&"word ".repeat(400), 100);
        assert!(extractive(&parts, "word", 0).is_none());
    }

    #[tokio::test]
    async fn semantic_separates_unrelated_sections() {
        let s = Truncator::default();
        let content = format!(
            "{}{}",
            "rust borrow checker ownership lifetimes ".repeat(20),
            "banana smoothie yogurt honey recipe ".repeat(20),
        );
        let parts = chunks(&content, 50);
        let groups = group_by_similarity(&parts, 0.8);
        assert!(groups.len() >= 2);
        assert!(groups.len() < parts.len());

        let strict = StrategyContext {
            similarity_threshold: 0.8,
            ..ctx(&s, 2_000)
        };
        let out = apply_strategy(SummaryStrategy::Semantic, &parts, "", strict)
            .await
            .unwrap();
        assert!(out.starts_with("## Section 1"));
        assert_eq!(s.calls.load(Ordering::SeqCst), groups.len());
    }

    #[tokio::test]
    async fn hybrid_narrows_then_reduces() {
        let s = Truncator::default();
        let parts = chunks(&"alpha beta gamma ".repeat(2_000), 100);
        let out = apply_strategy(SummaryStrategy::Hybrid, &parts, "beta", ctx(&s, 200))
            .await
            .unwrap();
        // At most enough chunks for three budgets, plus the merge.
        let calls = s.calls.load(Ordering::SeqCst);
        assert!(calls < parts.len());
        assert!(calls >= 2);
        assert!(HeuristicEstimator.estimate(&out) <= 200);
    }

    #[tokio::test]
    async fn summarizer_failure_is_preprocessing_error() {
        let parts = chunks(&"text ".repeat(500), 100);
        let err = apply_strategy(SummaryStrategy::Hierarchical, &parts, "", ctx(&Failing, 500))
            .await
            .unwrap_err();
        match err {
            SwitchyardError::Preprocessing { strategy, message, .. } => {
                assert_eq!(strategy, SummaryStrategy::Hierarchical);
                assert!(message.contains("quota exhausted"));
            }
            other => panic!("expected Preprocessing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_summary_is_rejected() {
        struct Verbose;
        #[async_trait]
        impl Summarizer for Verbose {
            async fn summarize(&self, text: &str, _: &str, _: u32, _: Instant) -> Result<String, SwitchyardError> {
                Ok(text.repeat(10))
            }
        }
        let parts = chunks("a modest document body", 100);
        let err = apply_strategy(SummaryStrategy::Hierarchical, &parts, "", ctx(&Verbose, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::Preprocessing { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_summarizer_stops_at_the_request_deadline() {
        let parts = chunks(&"text ".repeat(500), 100);
        let started = Instant::now();
        let limited = StrategyContext {
            deadline: Deadline::after(Duration::from_secs(2)),
            ..ctx(&Hanging, 500)
        };
        let err = apply_strategy(SummaryStrategy::Hierarchical, &parts, "", limited)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::Timeout { duration } if duration == Duration::from_secs(2)));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_the_request_stops_summarization() {
        let parts = chunks(&"text ".repeat(500), 100);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let err = apply_strategy(
            SummaryStrategy::Semantic,
            &parts,
            "",
            StrategyContext {
                cancel: &cancel,
                ..ctx(&Hanging, 500)
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SwitchyardError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn extractive_ignores_an_expired_deadline() {
        let parts = chunks(&"word ".repeat(400), 100);
        let expired = StrategyContext {
            deadline: Deadline::after(Duration::ZERO),
            ..ctx(&Hanging, 10_000)
        };
        assert!(
            apply_strategy(SummaryStrategy::Extractive, &parts, "word", expired)
                .await
                .is_ok()
        );
    }

    #[test]
    fn cosine_of_identical_and_disjoint_vectors() {
        let a = term_frequencies("alpha beta gamma");
        let b = term_frequencies("delta epsilon zeta");
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-9);
        assert_eq!(cosine(&a, &b), 0.0);
    }
}
