// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes:
//! tier entries must reference declared models, chunk limits must be ordered,
//! ratios must lie in their unit ranges.

use std::collections::HashSet;

use switchyard_core::types::ComplexityTier;

use crate::diagnostic::{ConfigError, suggest_key};
use crate::model::{CacheBackend, SwitchyardConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Longest supported metrics query period.
const LONGEST_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SwitchyardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_service(config, &mut errors);
    validate_models(config, &mut errors);
    validate_routing(config, &mut errors);
    validate_circuit_breaker(config, &mut errors);
    validate_chunking(config, &mut errors);
    validate_cache(config, &mut errors);
    validate_preprocessing(config, &mut errors);
    validate_metrics(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    let level = config.service.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level `{}` must be one of: {}",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.service.default_deadline_secs == 0 {
        errors.push(ConfigError::out_of_range(
            "service.default_deadline_secs",
            0,
            "a positive number of seconds",
        ));
    }
}

fn validate_models(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    if config.models.is_empty() {
        errors.push(ConfigError::Validation {
            message: "at least one [[models]] entry is required".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for model in &config.models {
        if model.id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "models.id must not be empty".to_string(),
            });
            continue;
        }
        if !seen.insert(model.id.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!("model `{}` is declared more than once", model.id),
            });
        }

        for (field, value) in [
            ("input_cost_per_1k", model.input_cost_per_1k),
            ("output_cost_per_1k", model.output_cost_per_1k),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::out_of_range(
                    &format!("models.{}.{field}", model.id),
                    value,
                    "a non-negative cost",
                ));
            }
        }

        if model.context_window == 0 {
            errors.push(ConfigError::out_of_range(
                &format!("models.{}.context_window", model.id),
                0,
                "a positive token count",
            ));
        }

        if !(0.0..=1.0).contains(&model.reliability) {
            errors.push(ConfigError::out_of_range(
                &format!("models.{}.reliability", model.id),
                model.reliability,
                "a value in [0, 1]",
            ));
        }
    }
}

fn validate_routing(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    let declared: Vec<&str> = config.models.iter().map(|m| m.id.as_str()).collect();

    for tier in ComplexityTier::ALL {
        let entries = config.routing.tier(tier);
        if entries.is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("routing.{tier} must list at least one model"),
            });
        }

        let mut seen = HashSet::new();
        for entry in entries {
            if !declared.contains(&entry.model.as_str()) {
                errors.push(unknown_model(&tier.to_string(), &entry.model, &declared));
            }
            if !seen.insert(entry.model.as_str()) {
                errors.push(ConfigError::Validation {
                    message: format!("routing.{tier} lists `{}` more than once", entry.model),
                });
            }
        }
    }

    if !declared.contains(&config.routing.baseline_model.as_str()) {
        errors.push(unknown_model(
            "baseline_model",
            &config.routing.baseline_model,
            &declared,
        ));
    }
}

fn unknown_model(tier: &str, model: &str, declared: &[&str]) -> ConfigError {
    ConfigError::UnknownModel {
        tier: tier.to_string(),
        model: model.to_string(),
        suggestion: suggest_key(model, declared),
        declared: declared.join(", "),
    }
}

fn validate_circuit_breaker(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    let cb = &config.circuit_breaker;
    if cb.failure_threshold == 0 {
        errors.push(ConfigError::out_of_range(
            "circuit_breaker.failure_threshold",
            0,
            "at least 1",
        ));
    }
    if cb.failure_window_secs == 0 {
        errors.push(ConfigError::out_of_range(
            "circuit_breaker.failure_window_secs",
            0,
            "a positive number of seconds",
        ));
    }
    if cb.cooldown_secs == 0 {
        errors.push(ConfigError::out_of_range(
            "circuit_breaker.cooldown_secs",
            0,
            "a positive number of seconds",
        ));
    }
}

fn validate_chunking(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    let c = &config.chunking;
    if c.min_chunk_tokens == 0 {
        errors.push(ConfigError::out_of_range(
            "chunking.min_chunk_tokens",
            0,
            "a positive token count",
        ));
    }
    if c.min_chunk_tokens > c.default_chunk_tokens || c.default_chunk_tokens > c.max_chunk_tokens {
        errors.push(ConfigError::Validation {
            message: format!(
                "chunking sizes must satisfy min <= default <= max, got {} / {} / {}",
                c.min_chunk_tokens, c.default_chunk_tokens, c.max_chunk_tokens
            ),
        });
    }
    if c.overlap_tokens.saturating_mul(2) >= c.min_chunk_tokens {
        errors.push(ConfigError::out_of_range(
            "chunking.overlap_tokens",
            c.overlap_tokens,
            "less than half of chunking.min_chunk_tokens",
        ));
    }
}

fn validate_cache(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    if config.cache.ttl_secs == 0 {
        errors.push(ConfigError::out_of_range(
            "cache.ttl_secs",
            0,
            "a positive number of seconds",
        ));
    }
    if config.cache.max_entries == 0 {
        errors.push(ConfigError::out_of_range(
            "cache.max_entries",
            0,
            "at least 1",
        ));
    }
    if config.cache.backend == CacheBackend::Sqlite && config.cache.database_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "cache.database_path must not be empty when cache.backend = \"sqlite\""
                .to_string(),
        });
    }
}

fn validate_preprocessing(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    let p = &config.preprocessing;
    if !(p.safety_margin > 0.0 && p.safety_margin <= 1.0) {
        errors.push(ConfigError::out_of_range(
            "preprocessing.safety_margin",
            p.safety_margin,
            "a fraction in (0, 1]",
        ));
    }
    if !(0.0..=1.0).contains(&p.semantic_similarity_threshold) {
        errors.push(ConfigError::out_of_range(
            "preprocessing.semantic_similarity_threshold",
            p.semantic_similarity_threshold,
            "a value in [0, 1]",
        ));
    }
    if p.summary_max_output_tokens == 0 {
        errors.push(ConfigError::out_of_range(
            "preprocessing.summary_max_output_tokens",
            0,
            "a positive token count",
        ));
    }
    if p.max_parallel_summaries == 0 {
        errors.push(ConfigError::out_of_range(
            "preprocessing.max_parallel_summaries",
            0,
            "at least 1",
        ));
    }
    if p.enabled && config.model(&p.summarizer_model).is_none() {
        let declared: Vec<&str> = config.models.iter().map(|m| m.id.as_str()).collect();
        errors.push(unknown_model("summarizer_model", &p.summarizer_model, &declared));
    }
}

fn validate_metrics(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    if config.metrics.retention_secs < LONGEST_PERIOD_SECS {
        errors.push(ConfigError::out_of_range(
            "metrics.retention_secs",
            config.metrics.retention_secs,
            "at least 86400 (the 1d query period)",
        ));
    }
    if config.metrics.max_events == 0 {
        errors.push(ConfigError::out_of_range(
            "metrics.max_events",
            0,
            "at least 1",
        ));
    }
}
