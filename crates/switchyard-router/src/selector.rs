// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate ranking and the fallback walk.
//!
//! [`ModelSelector::rank`] is a pure function of configuration and
//! constraints. [`ModelSelector::select_and_execute`] walks the ranked list,
//! consulting the shared [`CircuitBreakerRegistry`] before each attempt and
//! reporting every outcome back to it.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use switchyard_config::model::{ModelCandidate, RoutingConfig, SwitchyardConfig};
use switchyard_core::{ComplexityTier, SwitchyardError};
use switchyard_cost::{estimate_cost, value_score};
use switchyard_resilience::{CircuitBreakerRegistry, CircuitState, Deadline, run_with_deadline};

/// Caller constraints applied when building a tier's candidate list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionConstraints {
    /// When non-empty, restrict candidates to this set.
    pub preferred_models: Vec<String>,
    /// Ceiling on a candidate's estimated cost for this request, in USD.
    pub max_cost: Option<f64>,
    /// Ceiling on a candidate's declared average latency.
    pub max_latency_ms: Option<u64>,
    /// Token counts used for cost estimation.
    pub estimated_input_tokens: u64,
    pub estimated_output_tokens: u64,
}

/// A candidate that survived filtering, with its estimated cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub candidate: ModelCandidate,
    pub priority: u32,
    pub estimated_cost: f64,
}

/// One row of a ranking report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedCandidate {
    pub backend: String,
    pub priority: u32,
    pub estimated_cost: f64,
    pub context_window: u64,
    pub average_latency_ms: u64,
    pub state: CircuitState,
    pub available: bool,
    /// Relative value in `[0, 1]` among the ranked candidates; higher is better.
    pub value_score: f64,
}

/// Outcome of a successful fallback walk.
#[derive(Debug, Clone)]
pub struct Selection<T> {
    pub value: T,
    pub backend: ModelCandidate,
    /// Failed attempts before the successful one.
    pub fallback_depth: u32,
    /// Candidates skipped because their circuit was open.
    pub skipped: usize,
}

/// Selects candidates per tier and walks the fallback chain.
#[derive(Debug)]
pub struct ModelSelector {
    catalog: Vec<ModelCandidate>,
    routing: RoutingConfig,
    breakers: Arc<CircuitBreakerRegistry>,
}

impl ModelSelector {
    pub fn new(
        catalog: Vec<ModelCandidate>,
        routing: RoutingConfig,
        breakers: Arc<CircuitBreakerRegistry>,
    ) -> Self {
        Self {
            catalog,
            routing,
            breakers,
        }
    }

    pub fn from_config(config: &SwitchyardConfig, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self::new(config.models.clone(), config.routing.clone(), breakers)
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub fn candidate(&self, id: &str) -> Option<&ModelCandidate> {
        self.catalog.iter().find(|m| m.id == id)
    }

    /// Filtered and ordered candidate list for `tier`.
    ///
    /// Fails with `BudgetExceeded` only when candidates existed and
    /// `max_cost` removed all of them. An empty list is otherwise `Ok`.
    pub fn rank(
        &self,
        tier: ComplexityTier,
        constraints: &SelectionConstraints,
    ) -> Result<Vec<RankedCandidate>, SwitchyardError> {
        let mut ranked: Vec<RankedCandidate> = Vec::new();
        for entry in self.routing.tier(tier) {
            let Some(candidate) = self.candidate(&entry.model) else {
                warn!(model = %entry.model, %tier, "tier references undeclared model, skipping");
                continue;
            };
            if !constraints.preferred_models.is_empty()
                && !constraints.preferred_models.contains(&candidate.id)
            {
                continue;
            }
            if let Some(max_latency) = constraints.max_latency_ms {
                if candidate.average_latency_ms > max_latency {
                    continue;
                }
            }
            ranked.push(RankedCandidate {
                candidate: candidate.clone(),
                priority: entry.priority,
                estimated_cost: estimate_cost(
                    candidate,
                    constraints.estimated_input_tokens,
                    constraints.estimated_output_tokens,
                ),
            });
        }

        if let Some(max_cost) = constraints.max_cost {
            let before = ranked.len();
            ranked.retain(|r| r.estimated_cost <= max_cost);
            if ranked.is_empty() && before > 0 {
                return Err(SwitchyardError::BudgetExceeded {
                    tier,
                    max_cost,
                    excluded: before,
                });
            }
        }

        ranked.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.estimated_cost.total_cmp(&b.estimated_cost))
        });
        Ok(ranked)
    }

    /// Ranking report for `tier`: the ordered chain with availability and
    /// cost, without executing anything.
    pub fn plan(
        &self,
        tier: ComplexityTier,
        constraints: &SelectionConstraints,
    ) -> Result<Vec<PlannedCandidate>, SwitchyardError> {
        let ranked = self.rank(tier, constraints)?;
        let max_cost = ranked.iter().map(|r| r.estimated_cost).fold(0.0, f64::max);
        let max_latency = ranked
            .iter()
            .map(|r| r.candidate.average_latency_ms)
            .max()
            .unwrap_or(0);

        Ok(ranked
            .into_iter()
            .map(|r| PlannedCandidate {
                state: self.breakers.state(&r.candidate.id),
                available: self.breakers.is_available(&r.candidate.id),
                value_score: value_score(&r.candidate, r.estimated_cost, max_cost, max_latency),
                backend: r.candidate.id,
                priority: r.priority,
                estimated_cost: r.estimated_cost,
                context_window: r.candidate.context_window,
                average_latency_ms: r.candidate.average_latency_ms,
            })
            .collect())
    }

    /// Walk the ranked chain for `tier`, invoking `execute` on each available
    /// candidate until one succeeds.
    ///
    /// - Circuit-open candidates are skipped and never executed.
    /// - A transient failure is recorded against the candidate's breaker and
    ///   the walk continues.
    /// - A deadline expiry is recorded against the breaker and abandons the
    ///   rest of the chain.
    /// - Cancellation abandons the chain without charging the breaker.
    /// - A non-transient error from `execute` is returned as-is.
    pub async fn select_and_execute<T, F, Fut>(
        &self,
        tier: ComplexityTier,
        constraints: &SelectionConstraints,
        deadline: Deadline,
        cancel: &CancellationToken,
        mut execute: F,
    ) -> Result<Selection<T>, SwitchyardError>
    where
        F: FnMut(ModelCandidate) -> Fut,
        Fut: Future<Output = Result<T, SwitchyardError>>,
    {
        let ranked = self.rank(tier, constraints)?;
        let mut attempted = 0usize;
        let mut skipped = 0usize;
        let mut last_error: Option<String> = None;

        for entry in ranked {
            let id = entry.candidate.id.clone();
            if !self.breakers.try_acquire(&id) {
                debug!(backend = %id, %tier, "circuit open, skipping candidate");
                skipped += 1;
                continue;
            }

            attempted += 1;
            let outcome = run_with_deadline(deadline, cancel, execute(entry.candidate.clone())).await;
            match outcome {
                Ok(value) => {
                    self.breakers.record_success(&id);
                    let fallback_depth = (attempted - 1) as u32;
                    info!(backend = %id, %tier, fallback_depth, skipped, "request routed");
                    return Ok(Selection {
                        value,
                        backend: entry.candidate,
                        fallback_depth,
                        skipped,
                    });
                }
                Err(SwitchyardError::Cancelled) if cancel.is_cancelled() => {
                    self.breakers.release(&id);
                    info!(backend = %id, %tier, "attempt cancelled, abandoning fallback chain");
                    last_error = Some(SwitchyardError::Cancelled.to_string());
                    break;
                }
                Err(err) if err.is_transient() => {
                    self.breakers.record_failure(&id);
                    if deadline.is_expired() {
                        warn!(backend = %id, %tier, "deadline exceeded, abandoning fallback chain");
                        last_error = Some("deadline exceeded".to_string());
                        break;
                    }
                    warn!(backend = %id, %tier, error = %err, "candidate failed, trying next");
                    last_error = Some(err.to_string());
                }
                Err(err) => {
                    self.breakers.release(&id);
                    return Err(err);
                }
            }
        }

        Err(SwitchyardError::NoAvailableModel {
            tier,
            attempted,
            skipped,
            last_error,
        })
    }
}
