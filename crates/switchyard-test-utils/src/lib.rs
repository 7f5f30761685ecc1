// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Switchyard integration tests.
//!
//! Provides a scripted model backend and test harness infrastructure for
//! fast, deterministic tests without network access.
//!
//! # Components
//!
//! - [`ScriptedBackend`] - Model backend with per-backend outcome scripts and a call log
//! - [`TestHarness`] - Orchestrator wired to a scripted backend and a summary cache

pub mod harness;
pub mod mock_backend;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_backend::{Outcome, RecordedCall, ScriptedBackend};
