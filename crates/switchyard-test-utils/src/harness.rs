// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete orchestrator over a [`ScriptedBackend`]
//! with either an in-memory or a temp-file SQLite summary cache, and exposes
//! `send()` to drive the full request pipeline in tests.

use std::sync::Arc;

use switchyard_config::model::{SwitchyardConfig, TierEntry};
use switchyard_context::{MemorySummaryCache, SqliteSummaryCache, SummaryCache};
use switchyard_core::{ComplexityTier, OrchestrationRequest, SwitchyardError};
use switchyard_orchestrator::{OrchestrationResult, Orchestrator};

use crate::mock_backend::ScriptedBackend;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: SwitchyardConfig,
    backend: ScriptedBackend,
    sqlite_cache: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: SwitchyardConfig::default(),
            backend: ScriptedBackend::new(),
            sqlite_cache: false,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: SwitchyardConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjust the default configuration in place.
    pub fn configure(mut self, f: impl FnOnce(&mut SwitchyardConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Set the fallback chain for `tier`, highest priority first.
    pub fn with_tier(mut self, tier: ComplexityTier, models: &[&str]) -> Self {
        let entries = models
            .iter()
            .zip(1u32..)
            .map(|(model, priority)| TierEntry::new(*model, priority))
            .collect();
        match tier {
            ComplexityTier::Simple => self.config.routing.simple = entries,
            ComplexityTier::Moderate => self.config.routing.moderate = entries,
            ComplexityTier::Complex => self.config.routing.complex = entries,
        }
        self
    }

    pub fn with_backend(mut self, backend: ScriptedBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Store summaries in a SQLite file inside a temp directory.
    pub fn with_sqlite_cache(mut self) -> Self {
        self.sqlite_cache = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SwitchyardError> {
        let mut temp_dir = None;
        let cache: Arc<dyn SummaryCache> = if self.sqlite_cache {
            let dir = tempfile::TempDir::new()
                .map_err(|e| SwitchyardError::Storage { source: e.into() })?;
            let path = dir.path().join("cache.db").to_string_lossy().to_string();
            let cache = SqliteSummaryCache::open(&path).await?;
            temp_dir = Some(dir);
            Arc::new(cache)
        } else {
            Arc::new(MemorySummaryCache::new(self.config.cache.max_entries))
        };

        let backend = Arc::new(self.backend);
        let orchestrator = Orchestrator::new(&self.config, backend.clone(), cache)?;

        Ok(TestHarness {
            orchestrator,
            backend,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment over a scripted backend.
pub struct TestHarness {
    pub orchestrator: Orchestrator,
    /// The scripted backend, shared with the orchestrator.
    pub backend: Arc<ScriptedBackend>,
    pub config: SwitchyardConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send plain request text through the full pipeline.
    pub async fn send(&self, text: &str) -> Result<OrchestrationResult, SwitchyardError> {
        self.orchestrator
            .orchestrate(&OrchestrationRequest::new(text))
            .await
    }

    pub async fn send_request(
        &self,
        request: &OrchestrationRequest,
    ) -> Result<OrchestrationResult, SwitchyardError> {
        self.orchestrator.orchestrate(request).await
    }
}
