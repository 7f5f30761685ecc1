// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete Switchyard pipeline.
//!
//! Each test creates an isolated TestHarness with a scripted backend and its
//! own summary cache. Tests are independent and order-insensitive.

use std::time::Duration;

use switchyard_core::{ComplexityTier, Intent, OrchestrationRequest, RequestOptions};
use switchyard_metrics::MetricsPeriod;
use switchyard_resilience::CircuitState;
use switchyard_test_utils::{Outcome, ScriptedBackend, TestHarness};

const LOOKUP: &str = "List all files in the project";
const REVIEW: &str = "Summarize the key risks in this report";

fn long_report() -> String {
    "Finding: the primary datacenter lease expires before the migration completes.\n".repeat(26_000)
}

// ---- Test 1: Simple lookup on the cheapest backend ----

#[tokio::test]
async fn test_simple_lookup_is_served_by_the_first_candidate() {
    let harness = TestHarness::builder()
        .with_tier(ComplexityTier::Simple, &["gemini-2.0-flash", "gpt-3.5-turbo"])
        .configure(|c| {
            if let Some(gemini) = c.models.iter_mut().find(|m| m.id == "gemini-2.0-flash") {
                gemini.input_cost_per_1k = 0.0001;
                gemini.output_cost_per_1k = 0.0004;
            }
        })
        .with_backend(ScriptedBackend::new().respond("gemini-2.0-flash", "src/\nCargo.toml\nREADME.md"))
        .build()
        .await
        .unwrap();

    let result = harness.send(LOOKUP).await.unwrap();
    assert_eq!(result.intent, Intent::Read);
    assert_eq!(result.tier, ComplexityTier::Simple);
    assert_eq!(result.backend, "gemini-2.0-flash");
    assert_eq!(result.fallback_depth, 0);
    assert_eq!(harness.backend.call_order(), vec!["gemini-2.0-flash"]);

    let gemini = harness.config.model("gemini-2.0-flash").unwrap();
    let expected = f64::from(result.usage.input_tokens) / 1000.0 * gemini.input_cost_per_1k
        + f64::from(result.usage.output_tokens) / 1000.0 * gemini.output_cost_per_1k;
    assert!(result.usage.input_tokens > 0 && result.usage.output_tokens > 0);
    assert!(expected > 0.0);
    assert!((result.cost_usd - expected).abs() < 1e-12);
}

// ---- Test 2: Summary cache persistence ----

#[tokio::test]
async fn test_sqlite_cache_serves_repeated_document() {
    let harness = TestHarness::builder()
        .with_sqlite_cache()
        .with_backend(ScriptedBackend::new().respond("gemini-2.0-flash", "Lease expiry is the main risk."))
        .build()
        .await
        .unwrap();
    let request = OrchestrationRequest::new(REVIEW).with_document(long_report());

    let first = harness.send_request(&request).await.unwrap();
    let pre = first.preprocessing.unwrap();
    assert!(!pre.cache_hit);
    assert!(pre.summary_tokens < pre.original_tokens);

    let stats = harness.orchestrator.preprocessor().cache().stats().await.unwrap();
    assert_eq!(stats.entries, 1);

    let summarizer_calls = harness.backend.call_count("gemini-2.0-flash");
    let second = harness.send_request(&request).await.unwrap();
    assert!(second.preprocessing.unwrap().cache_hit);
    assert_eq!(harness.backend.call_count("gemini-2.0-flash"), summarizer_calls);
    assert_eq!(second.output, first.output);
}

#[tokio::test]
async fn test_whitespace_variants_share_a_cache_entry() {
    let harness = TestHarness::builder()
        .with_backend(ScriptedBackend::new().respond("gemini-2.0-flash", "Lease expiry."))
        .build()
        .await
        .unwrap();
    let report = long_report();
    let padded = format!("\n\n{}   \n", report.replace('\n', "  \n"));

    harness
        .send_request(&OrchestrationRequest::new(REVIEW).with_document(report))
        .await
        .unwrap();
    let again = harness
        .send_request(&OrchestrationRequest::new(REVIEW).with_document(padded))
        .await
        .unwrap();
    assert!(again.preprocessing.unwrap().cache_hit);
}

// ---- Test 3: Fallback and circuit recovery ----

#[tokio::test(start_paused = true)]
async fn test_open_circuit_recovers_after_cooldown() {
    let harness = TestHarness::builder()
        .with_tier(ComplexityTier::Simple, &["gemini-2.0-flash", "gpt-3.5-turbo"])
        .configure(|c| {
            c.circuit_breaker.failure_threshold = 2;
            c.circuit_breaker.cooldown_secs = 30;
        })
        .with_backend(ScriptedBackend::new().fail("gemini-2.0-flash", "503"))
        .build()
        .await
        .unwrap();

    harness.send(LOOKUP).await.unwrap();
    harness.send(LOOKUP).await.unwrap();
    let breakers = harness.orchestrator.breakers();
    assert_eq!(breakers.state("gemini-2.0-flash"), CircuitState::Open);

    harness
        .backend
        .set_outcome("gemini-2.0-flash", Outcome::Respond("back online".into()));
    let still_open = harness.send(LOOKUP).await.unwrap();
    assert_eq!(still_open.backend, "gpt-3.5-turbo");
    assert_eq!(still_open.skipped, 1);

    tokio::time::advance(Duration::from_secs(31)).await;

    let recovered = harness.send(LOOKUP).await.unwrap();
    assert_eq!(recovered.backend, "gemini-2.0-flash");
    assert_eq!(recovered.output, "back online");
    assert_eq!(breakers.state("gemini-2.0-flash"), CircuitState::Closed);
    assert_eq!(breakers.failure_count("gemini-2.0-flash"), 0);
}

#[tokio::test]
async fn test_transient_failures_do_not_leak_into_next_request() {
    let harness = TestHarness::builder()
        .with_tier(ComplexityTier::Simple, &["gemini-2.0-flash", "gpt-3.5-turbo"])
        .with_backend(ScriptedBackend::new().fail_times("gemini-2.0-flash", 1, "timeout"))
        .build()
        .await
        .unwrap();

    let first = harness.send(LOOKUP).await.unwrap();
    assert_eq!(first.backend, "gpt-3.5-turbo");
    assert_eq!(first.fallback_depth, 1);

    let second = harness.send(LOOKUP).await.unwrap();
    assert_eq!(second.backend, "gemini-2.0-flash");
    assert_eq!(second.fallback_depth, 0);
    assert_eq!(
        harness.orchestrator.breakers().failure_count("gemini-2.0-flash"),
        0
    );
}

// ---- Test 4: Request options ----

#[tokio::test]
async fn test_preferred_models_restrict_the_chain() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = OrchestrationRequest::new(LOOKUP).with_options(RequestOptions {
        preferred_models: vec!["claude-3-haiku".into()],
        ..Default::default()
    });

    let result = harness.send_request(&request).await.unwrap();
    assert_eq!(result.backend, "claude-3-haiku");
    assert_eq!(harness.backend.call_order(), vec!["claude-3-haiku"]);
}

#[tokio::test]
async fn test_context_is_rendered_into_the_prompt() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = OrchestrationRequest::new(LOOKUP).with_context("repository", serde_json::json!("switchyard"));

    harness.send_request(&request).await.unwrap();
    let call = &harness.backend.calls()[0];
    assert!(call.prompt.starts_with(LOOKUP));
    assert!(call.prompt.contains("Context:\n- repository: switchyard"));
}

// ---- Test 5: Metrics ----

#[tokio::test]
async fn test_metrics_reflect_every_request() {
    let harness = TestHarness::builder()
        .with_tier(ComplexityTier::Simple, &["gpt-3.5-turbo"])
        .build()
        .await
        .unwrap();

    harness.send(LOOKUP).await.unwrap();
    harness.send("List all branches in the project").await.unwrap();
    harness.backend.set_outcome("gpt-3.5-turbo", Outcome::Fail("quota".into()));
    assert!(harness.send(LOOKUP).await.is_err());

    let agg = harness.orchestrator.metrics(MetricsPeriod::OneMinute);
    assert_eq!(agg.total_requests, 3);
    assert_eq!(agg.successful_requests, 2);
    assert_eq!(agg.failed_requests, 1);
    assert_eq!(agg.tier_distribution.get("simple"), Some(&3));
    assert_eq!(agg.intent_distribution.get(&Intent::Read.to_string()), Some(&3));
    assert!(agg.total_cost_usd > 0.0);
    assert!(agg.cost_saved_usd > 0.0);
    assert_eq!(agg.baseline_model, "gpt-4o");
}

#[tokio::test]
async fn test_longer_periods_contain_shorter_ones() {
    let harness = TestHarness::builder().build().await.unwrap();
    for _ in 0..4 {
        harness.send(LOOKUP).await.unwrap();
    }

    let counts: Vec<u64> = MetricsPeriod::ALL
        .iter()
        .map(|p| harness.orchestrator.metrics(*p).total_requests)
        .collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(counts[0], 4);
}

// ---- Test 6: Analysis ----

#[tokio::test]
async fn test_analysis_matches_execution_route() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = OrchestrationRequest::new(LOOKUP);

    let report = harness.orchestrator.analyze_only(&request).unwrap();
    let result = harness.send_request(&request).await.unwrap();
    assert_eq!(report.classification.intent, result.intent);
    assert_eq!(report.complexity.tier, result.tier);
    assert_eq!(report.recommended_backend.as_deref(), Some(result.backend.as_str()));
}
