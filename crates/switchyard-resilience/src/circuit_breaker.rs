// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-backend circuit breakers.
//!
//! One [`CircuitBreakerRegistry`] owns the state for every backend id and is
//! shared by reference across requests. Each id's state lives in its own
//! `DashMap` entry; every operation mutates it while holding that entry's
//! lock, so concurrent failures are never under-counted and an OPEN
//! transition is visible to the next caller.
//!
//! ```text
//!   CLOSED --threshold failures within window--> OPEN
//!   OPEN   --cooldown elapsed since last failure--> HALF_OPEN   (lazy, on read)
//!   HALF_OPEN --trial succeeds--> CLOSED
//!   HALF_OPEN --trial fails-----> OPEN (counter = threshold)
//! ```
//!
//! Time is read from `tokio::time::Instant` so tests can drive the cooldown
//! with a paused clock.

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use switchyard_config::model::CircuitBreakerConfig;
use switchyard_metrics::recording::record_circuit_transition;

/// Breaker thresholds shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub failure_window: Duration,
    pub cooldown: Duration,
}

impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            failure_window: Duration::from_secs(config.failure_window_secs),
            cooldown: Duration::from_secs(config.cooldown_secs),
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from(&CircuitBreakerConfig::default())
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    /// First failure of the current streak.
    streak_started: Option<Instant>,
    last_failure: Option<Instant>,
    /// When OPEN, the instant after which a half-open trial is permitted.
    trial_after: Option<Instant>,
    /// When HALF_OPEN, whether the single trial has been handed out.
    trial_in_flight: bool,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            streak_started: None,
            last_failure: None,
            trial_after: None,
            trial_in_flight: false,
        }
    }

    /// Apply the lazy OPEN -> HALF_OPEN transition. Returns true if it fired.
    fn refresh(&mut self, now: Instant) -> bool {
        if self.state == CircuitState::Open && self.trial_after.is_some_and(|t| now >= t) {
            self.state = CircuitState::HalfOpen;
            self.trial_in_flight = false;
            return true;
        }
        false
    }

    fn open(&mut self, now: Instant, cooldown: Duration) {
        self.state = CircuitState::Open;
        self.last_failure = Some(now);
        self.trial_after = Some(now + cooldown);
        self.trial_in_flight = false;
    }
}

/// Point-in-time view of one backend's breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub backend: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Time until a half-open trial is permitted, when OPEN.
    pub retry_in: Option<Duration>,
}

/// Keyed store of circuit breakers, one per backend id.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    circuits: DashMap<String, Circuit>,
    settings: BreakerSettings,
}

impl CircuitBreakerRegistry {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            circuits: DashMap::new(),
            settings,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(BreakerSettings::from(config))
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    /// Whether `id` may be called. Backends with no history are available.
    ///
    /// Does not claim the half-open trial; use [`try_acquire`](Self::try_acquire)
    /// immediately before executing.
    pub fn is_available(&self, id: &str) -> bool {
        let Some(mut circuit) = self.circuits.get_mut(id) else {
            return true;
        };
        if circuit.refresh(Instant::now()) {
            log_half_open(id);
        }
        match circuit.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => !circuit.trial_in_flight,
            CircuitState::Open => false,
        }
    }

    /// Claim permission to execute against `id`.
    ///
    /// In HALF_OPEN only the first caller gets the trial; the rest are
    /// refused until the trial's outcome is recorded.
    pub fn try_acquire(&self, id: &str) -> bool {
        let Some(mut circuit) = self.circuits.get_mut(id) else {
            return true;
        };
        if circuit.refresh(Instant::now()) {
            log_half_open(id);
        }
        match circuit.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen if !circuit.trial_in_flight => {
                circuit.trial_in_flight = true;
                debug!(backend = %id, "half-open trial granted");
                true
            }
            CircuitState::HalfOpen | CircuitState::Open => false,
        }
    }

    /// Hand back a half-open trial whose attempt ended without an outcome.
    pub fn release(&self, id: &str) {
        if let Some(mut circuit) = self.circuits.get_mut(id) {
            if circuit.state == CircuitState::HalfOpen {
                circuit.trial_in_flight = false;
            }
        }
    }

    pub fn record_success(&self, id: &str) {
        let Some(mut circuit) = self.circuits.get_mut(id) else {
            // No history means CLOSED with a zero counter already.
            return;
        };
        let now = Instant::now();
        if circuit.refresh(now) {
            log_half_open(id);
        }

        match circuit.state {
            CircuitState::HalfOpen => {
                *circuit = Circuit::new();
                info!(backend = %id, "circuit closed after successful trial");
                record_circuit_transition(id, CircuitState::Closed.into());
            }
            CircuitState::Closed => {
                circuit.consecutive_failures = 0;
                circuit.streak_started = None;
            }
            CircuitState::Open => {
                // An attempt that started before the circuit opened; the
                // cooldown still applies.
                debug!(backend = %id, "success recorded while circuit open");
            }
        }
    }

    pub fn record_failure(&self, id: &str) {
        let now = Instant::now();
        let settings = self.settings;
        let mut circuit = self
            .circuits
            .entry(id.to_string())
            .or_insert_with(Circuit::new);
        if circuit.refresh(now) {
            log_half_open(id);
        }

        match circuit.state {
            CircuitState::Closed => {
                let streak_expired = circuit
                    .streak_started
                    .is_none_or(|start| now.duration_since(start) > settings.failure_window);
                if streak_expired {
                    circuit.consecutive_failures = 1;
                    circuit.streak_started = Some(now);
                } else {
                    circuit.consecutive_failures += 1;
                }
                circuit.last_failure = Some(now);

                if circuit.consecutive_failures >= settings.failure_threshold {
                    circuit.open(now, settings.cooldown);
                    warn!(
                        backend = %id,
                        failures = circuit.consecutive_failures,
                        cooldown_secs = settings.cooldown.as_secs(),
                        "circuit opened"
                    );
                    record_circuit_transition(id, CircuitState::Open.into());
                } else {
                    debug!(
                        backend = %id,
                        failures = circuit.consecutive_failures,
                        threshold = settings.failure_threshold,
                        "failure recorded"
                    );
                }
            }
            CircuitState::HalfOpen => {
                circuit.consecutive_failures = settings.failure_threshold;
                circuit.open(now, settings.cooldown);
                warn!(backend = %id, "half-open trial failed, circuit re-opened");
                record_circuit_transition(id, CircuitState::Open.into());
            }
            CircuitState::Open => {
                circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
                circuit.open(now, settings.cooldown);
            }
        }
    }

    /// Current state of `id`, applying the lazy cooldown transition.
    pub fn state(&self, id: &str) -> CircuitState {
        match self.circuits.get_mut(id) {
            Some(mut circuit) => {
                if circuit.refresh(Instant::now()) {
                    log_half_open(id);
                }
                circuit.state
            }
            None => CircuitState::Closed,
        }
    }

    /// Consecutive-failure counter for `id`.
    pub fn failure_count(&self, id: &str) -> u32 {
        self.circuits
            .get(id)
            .map(|c| c.consecutive_failures)
            .unwrap_or(0)
    }

    /// Forget all history for `id`, returning it to CLOSED.
    pub fn reset(&self, id: &str) {
        if self.circuits.remove(id).is_some() {
            info!(backend = %id, "circuit reset");
        }
    }

    /// Every backend with recorded history, sorted by id.
    pub fn snapshot(&self) -> Vec<CircuitSnapshot> {
        let now = Instant::now();
        let mut out: Vec<CircuitSnapshot> = self
            .circuits
            .iter_mut()
            .map(|mut entry| {
                entry.refresh(now);
                let retry_in = match entry.state {
                    CircuitState::Open => entry.trial_after.map(|t| t.saturating_duration_since(now)),
                    _ => None,
                };
                CircuitSnapshot {
                    backend: entry.key().clone(),
                    state: entry.state,
                    consecutive_failures: entry.consecutive_failures,
                    retry_in,
                }
            })
            .collect();
        out.sort_by(|a, b| a.backend.cmp(&b.backend));
        out
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerSettings::default())
    }
}

fn log_half_open(id: &str) {
    info!(backend = %id, "cooldown elapsed, circuit half-open");
    record_circuit_transition(id, CircuitState::HalfOpen.into());
}
