// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request validation ahead of classification.

use std::time::Duration;

use switchyard_core::{OrchestrationRequest, SwitchyardError};

pub const MAX_TEXT_CHARS: usize = 10_000;
pub const MAX_PREFERRED_MODELS: usize = 10;
pub const MAX_COST_CEILING: f64 = 100.0;
pub const MIN_LATENCY_MS: u64 = 100;
pub const MAX_LATENCY_MS: u64 = 300_000;

fn reject(reason: impl Into<String>) -> SwitchyardError {
    SwitchyardError::ClassificationFailure {
        reason: reason.into(),
    }
}

/// Reject malformed requests before any routing work is done.
pub fn validate_request(request: &OrchestrationRequest) -> Result<(), SwitchyardError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(reject("request text is empty"));
    }
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(reject(format!(
            "request text is {chars} characters, limit is {MAX_TEXT_CHARS}"
        )));
    }

    let options = &request.options;
    if options.preferred_models.len() > MAX_PREFERRED_MODELS {
        return Err(reject(format!(
            "{} preferred models given, limit is {MAX_PREFERRED_MODELS}",
            options.preferred_models.len()
        )));
    }
    if let Some(max_cost) = options.max_cost {
        if !(0.0..=MAX_COST_CEILING).contains(&max_cost) {
            return Err(reject(format!(
                "max_cost {max_cost} is outside [0, {MAX_COST_CEILING}]"
            )));
        }
    }
    if let Some(latency) = options.max_latency_ms {
        if !(MIN_LATENCY_MS..=MAX_LATENCY_MS).contains(&latency) {
            return Err(reject(format!(
                "max_latency_ms {latency} is outside [{MIN_LATENCY_MS}, {MAX_LATENCY_MS}]"
            )));
        }
    }
    if options.deadline == Some(Duration::ZERO) {
        return Err(reject("deadline must be non-zero"));
    }
    Ok(())
}
