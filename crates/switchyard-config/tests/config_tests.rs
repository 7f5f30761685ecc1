// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Switchyard configuration system.

use std::path::Path;

use switchyard_config::diagnostic::ConfigError;
use switchyard_config::model::{CacheBackend, SwitchyardConfig, TokenizerKind};
use switchyard_config::{load_and_validate_str, load_config_from_path, load_config_from_str};
use switchyard_core::types::{ComplexityTier, SummaryStrategy};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_switchyard_config() {
    let toml = r#"
[service]
name = "edge-router"
log_level = "debug"
default_deadline_secs = 20

[[models]]
id = "gemini-2.0-flash"
input_cost_per_1k = 0.0001
output_cost_per_1k = 0.0004
context_window = 1000000
average_latency_ms = 800

[[models]]
id = "gpt-3.5-turbo"
input_cost_per_1k = 0.0005
output_cost_per_1k = 0.0015
context_window = 16385

[routing]
baseline_model = "gpt-3.5-turbo"
simple = [{ model = "gemini-2.0-flash", priority = 1 }, { model = "gpt-3.5-turbo", priority = 2 }]
moderate = [{ model = "gpt-3.5-turbo", priority = 1 }]
complex = [{ model = "gpt-3.5-turbo", priority = 1 }]

[circuit_breaker]
failure_threshold = 3
cooldown_secs = 10

[chunking]
default_chunk_tokens = 4000
overlap_tokens = 100

[cache]
backend = "sqlite"
ttl_secs = 600
database_path = "/tmp/summaries.db"

[preprocessing]
safety_margin = 0.8
default_strategy = "extractive"
summarizer_model = "gemini-2.0-flash"
tokenizer = "cl100k"

[metrics]
max_events = 5000
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "edge-router");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.service.default_deadline_secs, 20);
    assert_eq!(config.models.len(), 2);
    assert_eq!(config.models[1].average_latency_ms, 1000);
    assert_eq!(config.routing.tier(ComplexityTier::Simple).len(), 2);
    assert_eq!(config.routing.baseline_model, "gpt-3.5-turbo");
    assert_eq!(config.circuit_breaker.failure_threshold, 3);
    assert_eq!(config.circuit_breaker.failure_window_secs, 60);
    assert_eq!(config.chunking.default_chunk_tokens, 4000);
    assert_eq!(config.chunking.min_chunk_tokens, 500);
    assert_eq!(config.cache.backend, CacheBackend::Sqlite);
    assert_eq!(config.cache.ttl_secs, 600);
    assert_eq!(
        config.preprocessing.default_strategy,
        SummaryStrategy::Extractive
    );
    assert_eq!(config.preprocessing.tokenizer, TokenizerKind::Cl100k);
    assert_eq!(config.metrics.max_events, 5000);

    assert!(load_and_validate_str(toml).is_ok());
}

/// An empty document yields the compiled defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    let defaults = SwitchyardConfig::default();
    assert_eq!(config.models, defaults.models);
    assert_eq!(config.routing.simple, defaults.routing.simple);
    assert_eq!(config.cache.ttl_secs, 86_400);
    assert!((config.preprocessing.safety_margin - 0.9).abs() < f64::EPSILON);
}

/// Declaring `[[models]]` replaces the default catalog rather than appending.
#[test]
fn models_array_replaces_default_catalog() {
    let toml = r#"
[[models]]
id = "local-llama"
context_window = 8192
"#;
    let config = load_config_from_str(toml).unwrap();
    assert_eq!(config.models.len(), 1);
    assert_eq!(config.models[0].id, "local-llama");
}

/// Unknown field in [circuit_breaker] produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_field_produces_suggestion() {
    let toml = r#"
[circuit_breaker]
cooldwn_secs = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "cooldwn_secs");
            assert_eq!(suggestion.as_deref(), Some("cooldown_secs"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Unknown field reports a source span pointing at the offending key.
#[test]
fn unknown_field_carries_source_span() {
    let toml = "[cache]\nttl_sec = 10\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    match &errors[0] {
        ConfigError::UnknownKey { span, .. } => {
            let span = span.expect("span should be resolved for inline source");
            assert_eq!(span.offset(), toml.find("ttl_sec").unwrap());
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Wrong value type is reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[circuit_breaker]
failure_threshold = "five"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

/// Unknown strategy names are rejected.
#[test]
fn unknown_strategy_is_rejected() {
    let toml = r#"
[preprocessing]
default_strategy = "telepathic"
"#;
    assert!(load_and_validate_str(toml).is_err());
}

/// Tier entries must reference declared models.
#[test]
fn tier_referencing_unknown_model_fails_validation() {
    let toml = r#"
[routing]
moderate = [{ model = "gpt-4o-mni", priority = 1 }]
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownModel { suggestion: Some(s), .. } if s == "gpt-4o-mini"
    )));
}

/// Default configuration survives a TOML round trip.
#[test]
fn defaults_serialize_to_loadable_toml() {
    let rendered = toml::to_string(&SwitchyardConfig::default()).unwrap();
    let reloaded = load_and_validate_str(&rendered).unwrap();
    assert_eq!(reloaded.models, SwitchyardConfig::default().models);
}

/// Environment variables override file values.
#[test]
fn env_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "switchyard.toml",
            r#"
[cache]
ttl_secs = 600
"#,
        )?;
        jail.set_env("SWITCHYARD_CACHE_TTL_SECS", "120");
        jail.set_env("SWITCHYARD_CIRCUIT_BREAKER_COOLDOWN_SECS", "45");

        let config = load_config_from_path(Path::new("switchyard.toml"))?;
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.circuit_breaker.cooldown_secs, 45);
        Ok(())
    });
}
