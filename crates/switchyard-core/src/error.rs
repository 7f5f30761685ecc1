// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Switchyard routing pipeline.

use thiserror::Error;

use crate::types::{ComplexityTier, SummaryStrategy};

/// The primary error type returned by every pipeline stage.
#[derive(Debug, Error)]
pub enum SwitchyardError {
    /// Configuration errors (invalid values, unknown candidates, bad thresholds).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed input rejected before classification.
    #[error("invalid request: {reason}")]
    ClassificationFailure { reason: String },

    /// Every candidate in the fallback chain was circuit-open or failed.
    #[error(
        "no available model for {tier} tier ({attempted} attempted, {skipped} skipped){}",
        last_error_suffix(.last_error)
    )]
    NoAvailableModel {
        tier: ComplexityTier,
        attempted: usize,
        skipped: usize,
        last_error: Option<String>,
    },

    /// A single candidate failed. Absorbed by the fallback walk unless it was the last one.
    #[error("execution failed on {backend}: {message}")]
    Execution {
        backend: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A summarization strategy could not produce a summary.
    #[error("preprocessing with {strategy} strategy failed: {message}")]
    Preprocessing {
        strategy: SummaryStrategy,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The cost ceiling excluded every candidate for the tier.
    #[error("max cost ${max_cost:.6} excludes all {excluded} candidates for {tier} tier")]
    BudgetExceeded {
        tier: ComplexityTier,
        max_cost: f64,
        excluded: usize,
    },

    /// A summary cache read returned an unreadable entry.
    #[error("cache entry {key} is unreadable: {message}")]
    CacheCorruption { key: String, message: String },

    /// Storage backend errors (summary cache database).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The caller cancelled the in-flight attempt.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwitchyardError {
    /// Shorthand for a candidate execution failure without an underlying source.
    pub fn execution(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Whether the fallback walk absorbs this error and moves to the next candidate.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Execution { .. } | Self::Timeout { .. } | Self::Cancelled
        )
    }
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(": {e}"),
        None => String::new(),
    }
}
