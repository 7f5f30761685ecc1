// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Uniform execute capability for language-model backends.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::SwitchyardError;
use crate::types::TokenUsage;

/// A single call to one backend.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Identifier of the candidate being attempted.
    pub backend_id: String,
    /// Optional system instruction placed ahead of the prompt.
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub max_output_tokens: u32,
    /// Point in time after which the caller abandons the call.
    pub deadline: Instant,
}

/// Output of a successful backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResponse {
    pub output: String,
    pub usage: TokenUsage,
}

/// Client for the concrete model providers.
///
/// Implementations perform the network call for `request.backend_id`. They
/// should honor `deadline`, though the caller also enforces it by dropping
/// the future once it passes.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Executes one prompt against the named backend.
    async fn execute(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResponse, SwitchyardError>;
}
