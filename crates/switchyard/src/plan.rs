// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchyard plan` command implementation.
//!
//! Prints the ranked fallback chain for one tier using the configured
//! token assumptions, as a table or as JSON for scripting.

use std::str::FromStr;
use std::sync::Arc;

use switchyard_config::model::SwitchyardConfig;
use switchyard_core::{ComplexityTier, SwitchyardError};
use switchyard_resilience::CircuitBreakerRegistry;
use switchyard_router::{ComplexityAnalyzer, ModelSelector, PlannedCandidate, RequestPlanner};

/// Rank the configured chain for `tier`.
pub fn plan(config: &SwitchyardConfig, tier: &str) -> Result<Vec<PlannedCandidate>, SwitchyardError> {
    let tier = ComplexityTier::from_str(tier).map_err(|_| {
        SwitchyardError::Config(format!(
            "unknown tier '{tier}', expected simple, moderate, or complex"
        ))
    })?;

    let estimator = switchyard_context::build_estimator(config.preprocessing.tokenizer)?;
    let breakers = Arc::new(CircuitBreakerRegistry::from_config(&config.circuit_breaker));
    let selector = Arc::new(ModelSelector::from_config(config, breakers));
    let planner = RequestPlanner::new(ComplexityAnalyzer::new(estimator), selector);
    planner.plan_tier(tier, &config.routing)
}

fn render_table(chain: &[PlannedCandidate]) -> String {
    let mut out = format!(
        "{:<4} {:<24} {:>8} {:>12} {:>10} {:>10} {:>6}\n",
        "#", "BACKEND", "PRIORITY", "EST. COST", "WINDOW", "LATENCY", "VALUE"
    );
    for (rank, c) in chain.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<24} {:>8} {:>12.6} {:>10} {:>8}ms {:>6.2}\n",
            rank + 1,
            c.backend,
            c.priority,
            c.estimated_cost,
            c.context_window,
            c.average_latency_ms,
            c.value_score
        ));
    }
    out
}

/// Run the `switchyard plan` command.
pub fn run_plan(config: &SwitchyardConfig, tier: &str, json: bool) -> Result<(), SwitchyardError> {
    let chain = plan(config, tier)?;
    if json {
        let out = serde_json::to_string_pretty(&chain)
            .map_err(|e| SwitchyardError::Internal(format!("failed to encode chain: {e}")))?;
        println!("{out}");
    } else if chain.is_empty() {
        println!("no eligible candidates for tier {tier}");
    } else {
        print!("{}", render_table(&chain));
    }
    Ok(())
}
