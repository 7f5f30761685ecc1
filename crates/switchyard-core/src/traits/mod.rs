// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits implemented outside the core.
//!
//! Traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod backend;

pub use backend::{ExecutionRequest, ExecutionResponse, ModelBackend};
