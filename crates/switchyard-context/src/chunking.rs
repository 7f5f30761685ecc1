// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Overlapping, restartable document chunking.
//!
//! Sizes are configured in tokens and converted to characters at
//! [`CHARS_PER_TOKEN`](switchyard_core::tokens::CHARS_PER_TOKEN), so every
//! offset here is a character offset into the source text. For content of
//! `n` characters the chunks satisfy:
//!
//! - the first starts at 0 and the last ends at `n`;
//! - chunk `i + 1` starts exactly `overlap` characters before chunk `i` ends;
//! - the same content and settings always produce the same boundaries.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use switchyard_config::model::ChunkingConfig;
use switchyard_core::tokens::tokens_to_chars;
use switchyard_core::{HeuristicEstimator, TokenEstimator};

/// Fraction of a chunk, measured back from its tentative end, searched for a
/// natural break.
const SNAP_WINDOW_DIVISOR: usize = 10;

/// One contiguous piece of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentChunk {
    pub index: usize,
    /// First character, inclusive.
    pub start: usize,
    /// Last character, exclusive.
    pub end: usize,
    pub text: String,
    pub estimated_tokens: usize,
}

impl DocumentChunk {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Splits content into overlapping chunks.
pub struct ChunkingEngine {
    default_chunk_tokens: usize,
    min_chunk_tokens: usize,
    max_chunk_tokens: usize,
    overlap_tokens: usize,
    estimator: Arc<dyn TokenEstimator>,
}

impl fmt::Debug for ChunkingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkingEngine")
            .field("default_chunk_tokens", &self.default_chunk_tokens)
            .field("min_chunk_tokens", &self.min_chunk_tokens)
            .field("max_chunk_tokens", &self.max_chunk_tokens)
            .field("overlap_tokens", &self.overlap_tokens)
            .finish_non_exhaustive()
    }
}

impl ChunkingEngine {
    pub fn new(config: &ChunkingConfig, estimator: Arc<dyn TokenEstimator>) -> Self {
        let min = config.min_chunk_tokens.max(1);
        let max = config.max_chunk_tokens.max(min);
        Self {
            default_chunk_tokens: config.default_chunk_tokens.clamp(min, max),
            min_chunk_tokens: min,
            max_chunk_tokens: max,
            overlap_tokens: config.overlap_tokens,
            estimator,
        }
    }

    pub fn with_heuristic(config: &ChunkingConfig) -> Self {
        Self::new(config, Arc::new(HeuristicEstimator))
    }

    /// Chunk `content` at the configured default size.
    pub fn chunk(&self, content: &str) -> Vec<DocumentChunk> {
        self.chunks(content, self.default_chunk_tokens).collect()
    }

    /// Chunk `content` at `chunk_tokens`, clamped to the configured bounds.
    pub fn chunk_with_size(&self, content: &str, chunk_tokens: usize) -> Vec<DocumentChunk> {
        self.chunks(content, chunk_tokens).collect()
    }

    /// Lazy chunk iterator. Each call starts over from the beginning.
    pub fn chunks<'a>(&'a self, content: &'a str, chunk_tokens: usize) -> Chunks<'a> {
        let size = tokens_to_chars(chunk_tokens.clamp(self.min_chunk_tokens, self.max_chunk_tokens));
        // Overlap must leave room for forward progress.
        let overlap = tokens_to_chars(self.overlap_tokens).min(size / 2);

        let mut offsets: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
        offsets.push(content.len());

        Chunks {
            content,
            offsets,
            size,
            overlap,
            next_start: Some(0),
            index: 0,
            estimator: self.estimator.as_ref(),
        }
    }

    /// Overlap in characters between consecutive chunks of `chunk_tokens`.
    pub fn overlap_chars(&self, chunk_tokens: usize) -> usize {
        let size = tokens_to_chars(chunk_tokens.clamp(self.min_chunk_tokens, self.max_chunk_tokens));
        tokens_to_chars(self.overlap_tokens).min(size / 2)
    }

    pub fn default_chunk_tokens(&self) -> usize {
        self.default_chunk_tokens
    }
}

/// Iterator over the chunks of one document. See [`ChunkingEngine::chunks`].
pub struct Chunks<'a> {
    content: &'a str,
    /// Byte offset of every character, plus `content.len()`.
    offsets: Vec<usize>,
    size: usize,
    overlap: usize,
    next_start: Option<usize>,
    index: usize,
    estimator: &'a dyn TokenEstimator,
}

impl Chunks<'_> {
    fn char_count(&self) -> usize {
        self.offsets.len() - 1
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.content[self.offsets[pos]..].chars().next()
    }

    /// Move `tentative` back to just after a newline, or failing that a
    /// whitespace character, within the last tenth of the chunk. Never moves
    /// to or before `start + overlap` so the next chunk still advances.
    fn snap(&self, start: usize, tentative: usize) -> usize {
        let window = (self.size / SNAP_WINDOW_DIVISOR).max(1);
        let floor = tentative
            .saturating_sub(window)
            .max(start + self.overlap + 1);
        if floor >= tentative {
            return tentative;
        }

        let after = |pred: fn(char) -> bool| {
            (floor..=tentative)
                .rev()
                .find(|&end| self.char_at(end - 1).is_some_and(pred))
        };
        after(|c| c == '\n')
            .or_else(|| after(char::is_whitespace))
            .unwrap_or(tentative)
    }
}

impl Iterator for Chunks<'_> {
    type Item = DocumentChunk;

    fn next(&mut self) -> Option<DocumentChunk> {
        let start = self.next_start?;
        let n = self.char_count();
        if n == 0 {
            self.next_start = None;
            return None;
        }

        let tentative = (start + self.size).min(n);
        let end = if tentative == n {
            n
        } else {
            self.snap(start, tentative)
        };

        self.next_start = if end == n {
            None
        } else {
            Some(end - self.overlap)
        };

        let text = self.content[self.offsets[start]..self.offsets[end]].to_string();
        let chunk = DocumentChunk {
            index: self.index,
            start,
            end,
            estimated_tokens: self.estimator.estimate(&text),
            text,
        };
        self.index += 1;
        Some(chunk)
    }
}
