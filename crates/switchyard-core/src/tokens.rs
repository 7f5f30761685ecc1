// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token estimation.
//!
//! The heuristic estimator (four characters per token) is the default: it is
//! deterministic, allocation-free, and fast enough for multi-megabyte
//! documents. The cl100k estimator gives exact counts for OpenAI-family
//! tokenizers at a higher cost.

use std::fmt;

use crate::error::SwitchyardError;

/// Characters per token assumed by the heuristic estimator.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimates how many tokens a piece of text occupies.
pub trait TokenEstimator: Send + Sync + fmt::Debug {
    fn estimate(&self, text: &str) -> usize;
}

/// `ceil(chars / 4)` estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// BPE estimator backed by the cl100k vocabulary.
pub struct TiktokenEstimator {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenEstimator {
    pub fn cl100k() -> Result<Self, SwitchyardError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| SwitchyardError::Internal(format!("failed to load cl100k vocabulary: {e}")))?;
        Ok(Self { bpe })
    }
}

impl fmt::Debug for TiktokenEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenEstimator").finish_non_exhaustive()
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Heuristic token count for `text`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Number of characters the heuristic maps to `tokens`.
pub fn tokens_to_chars(tokens: usize) -> usize {
    tokens.saturating_mul(CHARS_PER_TOKEN)
}
