// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted model backend for deterministic testing.
//!
//! `ScriptedBackend` implements `ModelBackend` with per-backend behavior:
//! queued one-shot outcomes, a default outcome, and an optional latency.
//! Every call is logged so tests can assert on the order of attempts.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use switchyard_core::{
    ExecutionRequest, ExecutionResponse, ModelBackend, SwitchyardError, TokenUsage,
    estimate_tokens,
};

/// What a scripted backend does with one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Respond(String),
    Fail(String),
    /// Never completes; only the deadline or cancellation ends the call.
    Hang,
}

#[derive(Debug, Default)]
struct Script {
    queued: VecDeque<Outcome>,
    default: Option<Outcome>,
    latency: Duration,
}

/// One observed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub backend_id: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub max_output_tokens: u32,
}

/// A `ModelBackend` whose behavior is set per backend id.
///
/// Unscripted backends answer `"response from {id}"`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn script<R>(&self, id: &str, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        f(scripts.entry(id.to_string()).or_default())
    }

    /// Answer every call to `id` with `text`.
    pub fn respond(self, id: &str, text: &str) -> Self {
        self.script(id, |s| s.default = Some(Outcome::Respond(text.to_string())));
        self
    }

    /// Fail every call to `id`.
    pub fn fail(self, id: &str, message: &str) -> Self {
        self.script(id, |s| s.default = Some(Outcome::Fail(message.to_string())));
        self
    }

    /// Fail the next `times` calls to `id`, then fall back to its default.
    pub fn fail_times(self, id: &str, times: usize, message: &str) -> Self {
        self.script(id, |s| {
            s.queued
                .extend(std::iter::repeat_n(Outcome::Fail(message.to_string()), times));
        });
        self
    }

    /// Never answer calls to `id`.
    pub fn hang(self, id: &str) -> Self {
        self.script(id, |s| s.default = Some(Outcome::Hang));
        self
    }

    /// Delay every call to `id` by `latency` before its outcome.
    pub fn with_latency(self, id: &str, latency: Duration) -> Self {
        self.script(id, |s| s.latency = latency);
        self
    }

    /// Replace the default outcome for `id` on a shared backend.
    pub fn set_outcome(&self, id: &str, outcome: Outcome) {
        self.script(id, |s| s.default = Some(outcome));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Backend ids in call order.
    pub fn call_order(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| c.backend_id.clone())
            .collect()
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.backend_id == id)
            .count()
    }

    fn next_outcome(&self, id: &str) -> (Outcome, Duration) {
        self.script(id, |s| {
            let outcome = s
                .queued
                .pop_front()
                .or_else(|| s.default.clone())
                .unwrap_or_else(|| Outcome::Respond(format!("response from {id}")));
            (outcome, s.latency)
        })
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, SwitchyardError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(RecordedCall {
            backend_id: request.backend_id.clone(),
            system_prompt: request.system_prompt.clone(),
            prompt: request.prompt.clone(),
            max_output_tokens: request.max_output_tokens,
        });
        let (outcome, latency) = self.next_outcome(&request.backend_id);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match outcome {
            Outcome::Respond(output) => {
                let input = estimate_tokens(request.system_prompt.as_deref().unwrap_or(""))
                    + estimate_tokens(&request.prompt);
                let usage = TokenUsage::new(
                    u32::try_from(input).unwrap_or(u32::MAX),
                    u32::try_from(estimate_tokens(&output)).unwrap_or(u32::MAX),
                );
                Ok(ExecutionResponse { output, usage })
            }
            Outcome::Fail(message) => Err(SwitchyardError::execution(request.backend_id, message)),
            Outcome::Hang => std::future::pending().await,
        }
    }
}
