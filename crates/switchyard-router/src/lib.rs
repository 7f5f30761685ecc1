// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request classification and model routing for Switchyard.
//!
//! This crate provides:
//! - [`IntentClassifier`]: keyword-based intent classification (zero-cost, zero-latency)
//! - [`ComplexityAnalyzer`]: tier scoring from text signals and referenced content size
//! - [`ModelSelector`]: per-tier candidate ranking and the circuit-guarded fallback walk
//! - [`RequestPlanner`]: the pure stages combined, for analysis without execution

pub mod classifier;
pub mod complexity;
pub mod planner;
pub mod selector;

pub use classifier::{ClassificationResult, IntentClassifier};
pub use complexity::{ComplexityAnalyzer, ComplexityScore};
pub use planner::{RequestPlanner, RoutingPlan};
pub use selector::{ModelSelector, PlannedCandidate, RankedCandidate, Selection, SelectionConstraints};
