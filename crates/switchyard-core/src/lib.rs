// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchyard routing pipeline.
//!
//! This crate provides the error type, the domain types shared by every
//! stage (intent, tier, request, metric event), the [`ModelBackend`]
//! collaborator trait that concrete provider clients implement, and token
//! estimation.

pub mod error;
pub mod tokens;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SwitchyardError;
pub use tokens::{HeuristicEstimator, TiktokenEstimator, TokenEstimator, estimate_tokens};
pub use traits::{ExecutionRequest, ExecutionResponse, ModelBackend};
pub use types::{
    ComplexityTier, Intent, MetricEvent, OrchestrationRequest, RequestOptions, SummaryStrategy,
    TokenUsage,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switchyard_error_has_all_variants() {
        let _config = SwitchyardError::Config("test".into());
        let _classification = SwitchyardError::ClassificationFailure {
            reason: "empty".into(),
        };
        let _exhausted = SwitchyardError::NoAvailableModel {
            tier: ComplexityTier::Moderate,
            attempted: 2,
            skipped: 1,
            last_error: None,
        };
        let _execution = SwitchyardError::execution("gpt-4o", "503");
        let _preprocessing = SwitchyardError::Preprocessing {
            strategy: SummaryStrategy::Hierarchical,
            message: "test".into(),
            source: None,
        };
        let _budget = SwitchyardError::BudgetExceeded {
            tier: ComplexityTier::Complex,
            max_cost: 0.001,
            excluded: 3,
        };
        let _corrupt = SwitchyardError::CacheCorruption {
            key: "abc".into(),
            message: "bad utf-8".into(),
        };
        let _storage = SwitchyardError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _timeout = SwitchyardError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _cancelled = SwitchyardError::Cancelled;
        let _internal = SwitchyardError::Internal("test".into());
    }

    #[test]
    fn only_attempt_failures_are_transient() {
        assert!(SwitchyardError::execution("a", "boom").is_transient());
        assert!(SwitchyardError::Cancelled.is_transient());
        assert!(
            SwitchyardError::Timeout {
                duration: std::time::Duration::from_millis(5)
            }
            .is_transient()
        );
        assert!(!SwitchyardError::Config("x".into()).is_transient());
        assert!(
            !SwitchyardError::ClassificationFailure {
                reason: "empty".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn exhaustion_message_carries_diagnostics() {
        let err = SwitchyardError::NoAvailableModel {
            tier: ComplexityTier::Moderate,
            attempted: 2,
            skipped: 1,
            last_error: Some("execution failed on b: 503".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("moderate"));
        assert!(msg.contains("2 attempted"));
        assert!(msg.contains("1 skipped"));
        assert!(msg.ends_with("execution failed on b: 503"));
    }
}
