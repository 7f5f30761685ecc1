// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pricing and resource estimation for the Switchyard routing pipeline.
//!
//! This crate provides:
//! - **Pricing**: per-candidate cost calculation from catalog rates
//! - **Baseline savings**: what a request would have cost on the baseline model
//! - **Resource estimates**: typical output size, latency, and timeout per tier

pub mod estimate;
pub mod pricing;

pub use estimate::{ResourceEstimate, estimate_resources, value_score};
pub use pricing::{ModelPricing, calculate_cost, estimate_cost, savings_against};
