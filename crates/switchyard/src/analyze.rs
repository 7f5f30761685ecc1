// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchyard analyze` command implementation.
//!
//! Runs classification, complexity scoring, and chain ranking for one
//! request and prints the analysis report. No backend is called.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use switchyard_config::model::SwitchyardConfig;
use switchyard_context::MemorySummaryCache;
use switchyard_core::{
    ExecutionRequest, ExecutionResponse, ModelBackend, OrchestrationRequest, SwitchyardError,
};
use switchyard_orchestrator::{AnalysisReport, Orchestrator};

/// Stand-in backend for commands that never execute.
///
/// Provider clients live outside this binary, so any call is an error.
#[derive(Debug, Default)]
pub struct OfflineBackend;

#[async_trait]
impl ModelBackend for OfflineBackend {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, SwitchyardError> {
        Err(SwitchyardError::execution(
            request.backend_id,
            "no backend client is configured for this process",
        ))
    }
}

/// Build the analysis report for `text` and an optional document file.
pub async fn analyze(
    config: &SwitchyardConfig,
    text: &str,
    document: Option<&Path>,
) -> Result<AnalysisReport, SwitchyardError> {
    let mut request = OrchestrationRequest::new(text);
    if let Some(path) = document {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SwitchyardError::Storage { source: e.into() })?;
        request = request.with_document(content);
    }

    let cache = Arc::new(MemorySummaryCache::new(config.cache.max_entries));
    let orchestrator = Orchestrator::new(config, Arc::new(OfflineBackend), cache)?;
    orchestrator.analyze_only(&request)
}

/// Run the `switchyard analyze` command, printing the report as JSON.
pub async fn run_analyze(
    config: &SwitchyardConfig,
    text: &str,
    document: Option<&Path>,
) -> Result<(), SwitchyardError> {
    let report = analyze(config, text, document).await?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| SwitchyardError::Internal(format!("failed to encode report: {e}")))?;
    println!("{json}");
    Ok(())
}
