// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request deadlines and cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use switchyard_core::SwitchyardError;

/// Absolute point in time by which a request must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// The total budget this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Drive `fut` until it completes, the deadline passes, or `cancel` fires.
///
/// Cancellation wins over the deadline when both are ready. An already
/// expired deadline or cancelled token fails without polling `fut`.
pub async fn run_with_deadline<F, T>(
    deadline: Deadline,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, SwitchyardError>
where
    F: Future<Output = Result<T, SwitchyardError>>,
{
    if cancel.is_cancelled() {
        return Err(SwitchyardError::Cancelled);
    }
    if deadline.is_expired() {
        return Err(SwitchyardError::Timeout {
            duration: deadline.budget(),
        });
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SwitchyardError::Cancelled),
        res = tokio::time::timeout_at(deadline.instant(), fut) => match res {
            Ok(inner) => inner,
            Err(_) => Err(SwitchyardError::Timeout { duration: deadline.budget() }),
        },
    }
}
