// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request lifecycle coordination for Switchyard.
//!
//! The [`Orchestrator`] drives one request through every stage:
//! - validates it and classifies its intent
//! - scores its complexity, counting any attached document
//! - reduces an oversized document to fit the smallest eligible backend
//! - walks the ranked fallback chain under the request deadline
//! - records exactly one metric event once classification has run

pub mod prompt;
pub mod report;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use switchyard_config::model::{ModelCandidate, SwitchyardConfig};
use switchyard_context::{
    BackendSummarizer, DocumentPreprocessor, SummaryCache, build_estimator, open_cache,
};
use switchyard_core::{
    ExecutionRequest, ExecutionResponse, MetricEvent, ModelBackend, OrchestrationRequest,
    SwitchyardError, TokenEstimator, TokenUsage,
};
use switchyard_cost::{ModelPricing, calculate_cost};
use switchyard_metrics::{MetricsAggregate, MetricsCollector, MetricsPeriod};
use switchyard_resilience::{CircuitBreakerRegistry, CircuitSnapshot, Deadline};
use switchyard_router::{
    ClassificationResult, ComplexityAnalyzer, ComplexityScore, ModelSelector, RequestPlanner,
    Selection, SelectionConstraints,
};

pub use prompt::{ExecutionPrompt, build_prompt};
pub use report::{AnalysisReport, OrchestrationResult, PreprocessingPlan, PreprocessingReport};
pub use validation::validate_request;

/// Per-request facts gathered along the way, for the metric event.
#[derive(Debug, Default)]
struct Trace {
    preprocessing: Option<PreprocessingReport>,
    fallback_depth: u32,
}

/// Coordinates classification, preprocessing, selection, and metrics.
pub struct Orchestrator {
    planner: RequestPlanner,
    preprocessor: Arc<DocumentPreprocessor>,
    backend: Arc<dyn ModelBackend>,
    collector: Arc<MetricsCollector>,
    estimator: Arc<dyn TokenEstimator>,
    default_deadline: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("planner", &self.planner)
            .field("preprocessor", &self.preprocessor)
            .field("default_deadline", &self.default_deadline)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Build every stage from `config`, opening the configured summary cache.
    pub async fn from_config(
        config: &SwitchyardConfig,
        backend: Arc<dyn ModelBackend>,
    ) -> Result<Self, SwitchyardError> {
        let cache = open_cache(&config.cache).await?;
        Self::new(config, backend, cache)
    }

    /// Build with an explicit cache store.
    pub fn new(
        config: &SwitchyardConfig,
        backend: Arc<dyn ModelBackend>,
        cache: Arc<dyn SummaryCache>,
    ) -> Result<Self, SwitchyardError> {
        let estimator = build_estimator(config.preprocessing.tokenizer)?;
        let default_deadline = Duration::from_secs(config.service.default_deadline_secs);

        let breakers = Arc::new(CircuitBreakerRegistry::from_config(&config.circuit_breaker));
        let selector = Arc::new(ModelSelector::from_config(config, breakers));
        let planner = RequestPlanner::new(ComplexityAnalyzer::new(estimator.clone()), selector);

        let summarizer = Arc::new(BackendSummarizer::new(
            backend.clone(),
            config.preprocessing.summarizer_model.clone(),
        ));
        let preprocessor = Arc::new(DocumentPreprocessor::new(
            config,
            estimator.clone(),
            summarizer,
            cache,
        ));
        let collector = Arc::new(MetricsCollector::from_config(config)?);

        info!(
            models = config.models.len(),
            cache = ?config.cache.backend,
            "orchestrator initialized"
        );

        Ok(Self {
            planner,
            preprocessor,
            backend,
            collector,
            estimator,
            default_deadline,
        })
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        self.planner.selector().breakers()
    }

    pub fn preprocessor(&self) -> &Arc<DocumentPreprocessor> {
        &self.preprocessor
    }

    pub fn collector(&self) -> &Arc<MetricsCollector> {
        &self.collector
    }

    pub fn metrics(&self, period: MetricsPeriod) -> MetricsAggregate {
        self.collector.query(period)
    }

    pub fn circuit_snapshot(&self) -> Vec<CircuitSnapshot> {
        self.breakers().snapshot()
    }

    /// Run `request` to completion.
    pub async fn orchestrate(
        &self,
        request: &OrchestrationRequest,
    ) -> Result<OrchestrationResult, SwitchyardError> {
        self.orchestrate_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run `request`, abandoning it when `cancel` fires.
    ///
    /// Cancellation fails the attempt in progress and ends the fallback walk.
    pub async fn orchestrate_with_cancel(
        &self,
        request: &OrchestrationRequest,
        cancel: &CancellationToken,
    ) -> Result<OrchestrationResult, SwitchyardError> {
        validate_request(request)?;
        let started = Instant::now();

        let classification = self.planner.classify(&request.text);
        let referenced = self.document_tokens(request);
        let complexity = self
            .planner
            .score(&request.text, &classification, referenced);

        let mut trace = Trace::default();
        let outcome = self
            .execute(request, &classification, &complexity, cancel, &mut trace)
            .await;
        let duration = started.elapsed();

        let tokens_saved = trace
            .preprocessing
            .as_ref()
            .map_or(0, PreprocessingReport::tokens_saved);
        let mut event = MetricEvent {
            timestamp: Utc::now(),
            intent: classification.intent,
            tier: complexity.tier,
            backend: None,
            usage: TokenUsage::default(),
            tokens_saved,
            cost_usd: 0.0,
            duration,
            success: false,
            fallback_depth: trace.fallback_depth,
            preprocessed: trace.preprocessing.is_some(),
            cache_hit: trace.preprocessing.as_ref().is_some_and(|p| p.cache_hit),
        };

        match outcome {
            Ok(selection) => {
                let usage = selection.value.usage;
                let cost_usd = calculate_cost(&usage, &ModelPricing::from(&selection.backend));
                event.backend = Some(selection.backend.id.clone());
                event.usage = usage;
                event.cost_usd = cost_usd;
                event.success = true;
                self.collector.record(event);

                info!(
                    intent = %classification.intent,
                    tier = %complexity.tier,
                    backend = %selection.backend.id,
                    fallback_depth = selection.fallback_depth,
                    cost_usd,
                    "request orchestrated"
                );
                Ok(OrchestrationResult {
                    output: selection.value.output,
                    backend: selection.backend.id,
                    intent: classification.intent,
                    confidence: classification.confidence,
                    tier: complexity.tier,
                    usage,
                    cost_usd,
                    fallback_depth: selection.fallback_depth,
                    skipped: selection.skipped,
                    duration,
                    preprocessing: trace.preprocessing,
                })
            }
            Err(err) => {
                self.collector.record(event);
                warn!(
                    intent = %classification.intent,
                    tier = %complexity.tier,
                    error = %err,
                    "request failed"
                );
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        request: &OrchestrationRequest,
        classification: &ClassificationResult,
        complexity: &ComplexityScore,
        cancel: &CancellationToken,
        trace: &mut Trace,
    ) -> Result<Selection<ExecutionResponse>, SwitchyardError> {
        let tier = complexity.tier;
        let selector = self.planner.selector();
        let mut constraints = SelectionConstraints::for_request(&request.options, complexity);
        // One deadline covers preprocessing and every backend attempt.
        let deadline = Deadline::after(request.options.deadline.unwrap_or(self.default_deadline));

        let mut summary: Option<String> = None;
        if let Some(content) = request.document() {
            // The cost ceiling applies to the prompt actually sent, which is
            // not known until the document has been reduced.
            let eligible = selector.rank(
                tier,
                &SelectionConstraints {
                    max_cost: None,
                    ..constraints.clone()
                },
            )?;
            if let Some(target) = preprocessing_target(eligible.iter().map(|r| &r.candidate)) {
                let decision = self.preprocessor.should_preprocess(content, target);
                if decision.needed {
                    let doc = self
                        .preprocessor
                        .preprocess(
                            content,
                            &request.text,
                            request.options.strategy,
                            target,
                            deadline,
                            cancel,
                        )
                        .await?;
                    trace.preprocessing = Some(PreprocessingReport::new(&target.id, &doc));
                    summary = Some(doc.summary);
                }
            }
        }

        let prompt = build_prompt(
            request,
            classification.intent,
            tier,
            summary.as_deref().or(request.document()),
        );
        constraints.estimated_input_tokens = self.prompt_tokens(&prompt);

        let max_output_tokens = u32::try_from(complexity.estimated_output_tokens).unwrap_or(u32::MAX);
        let backend = self.backend.clone();
        let system = prompt.system;
        let user = prompt.user;

        let outcome = selector
            .select_and_execute(tier, &constraints, deadline, cancel, |candidate| {
                let backend = backend.clone();
                let request = ExecutionRequest {
                    backend_id: candidate.id,
                    system_prompt: Some(system.clone()),
                    prompt: user.clone(),
                    max_output_tokens,
                    deadline: deadline.instant(),
                };
                async move { backend.execute(request).await }
            })
            .await;

        match &outcome {
            Ok(selection) => trace.fallback_depth = selection.fallback_depth,
            Err(SwitchyardError::NoAvailableModel { attempted, .. }) => {
                trace.fallback_depth = u32::try_from(*attempted).unwrap_or(u32::MAX);
            }
            Err(_) => {}
        }
        outcome
    }

    /// Classification, tier, and ranked chain for `request`, without execution.
    ///
    /// Candidates are priced the way execution prices them: a document that
    /// needs reducing counts as a full preprocessing budget, not its raw size.
    pub fn analyze_only(
        &self,
        request: &OrchestrationRequest,
    ) -> Result<AnalysisReport, SwitchyardError> {
        validate_request(request)?;
        let classification = self.planner.classify(&request.text);
        let complexity =
            self.planner
                .score(&request.text, &classification, self.document_tokens(request));
        let mut constraints = SelectionConstraints::for_request(&request.options, &complexity);

        let mut preprocessing = None;
        if let Some(content) = request.document() {
            let eligible = self.planner.selector().rank(
                complexity.tier,
                &SelectionConstraints {
                    max_cost: None,
                    ..constraints.clone()
                },
            )?;
            if let Some(target) = preprocessing_target(eligible.iter().map(|r| &r.candidate)) {
                let decision = self.preprocessor.should_preprocess(content, target);
                if decision.needed {
                    let prompt = build_prompt(request, classification.intent, complexity.tier, None);
                    constraints.estimated_input_tokens =
                        self.prompt_tokens(&prompt) + decision.budget_tokens as u64;
                }
                preprocessing = Some(PreprocessingPlan {
                    target: target.id.clone(),
                    decision,
                });
            }
        }

        let plan = self
            .planner
            .plan_scored(classification, complexity, &constraints)?;
        Ok(AnalysisReport {
            classification: plan.classification,
            complexity: plan.complexity,
            resources: plan.resources,
            recommended_backend: plan.recommended_backend,
            estimated_cost: plan.estimated_cost,
            chain: plan.chain,
            preprocessing,
        })
    }

    fn prompt_tokens(&self, prompt: &ExecutionPrompt) -> u64 {
        (self.estimator.estimate(&prompt.system) + self.estimator.estimate(&prompt.user)) as u64
    }

    fn document_tokens(&self, request: &OrchestrationRequest) -> u64 {
        request
            .document()
            .map_or(0, |doc| self.estimator.estimate(doc) as u64)
    }
}

/// The candidate with the smallest context window; a summary sized for it
/// fits every other candidate in the chain. Earlier candidates win ties.
fn preprocessing_target<'a>(
    candidates: impl Iterator<Item = &'a ModelCandidate>,
) -> Option<&'a ModelCandidate> {
    candidates.min_by_key(|c| c.context_window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_window_is_the_target() {
        let a = ModelCandidate::new("a", 0.0, 0.0, 128_000);
        let b = ModelCandidate::new("b", 0.0, 0.0, 16_385);
        let c = ModelCandidate::new("c", 0.0, 0.0, 16_385);
        let all = [a, b, c];
        assert_eq!(preprocessing_target(all.iter()).unwrap().id, "b");
        assert!(preprocessing_target(std::iter::empty()).is_none());
    }
}
