// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for the Switchyard routing pipeline.
//!
//! - [`CircuitBreakerRegistry`]: one breaker per backend id, shared across requests.
//! - [`Deadline`] and [`run_with_deadline`]: bound a backend attempt by the
//!   request deadline and a cancellation token.

pub mod circuit_breaker;
pub mod deadline;

pub use circuit_breaker::{BreakerSettings, CircuitBreakerRegistry, CircuitSnapshot, CircuitState};
pub use deadline::{Deadline, run_with_deadline};
