// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document preprocessing for Switchyard.
//!
//! Oversized documents are split by the [`ChunkingEngine`], reduced by one of
//! the summarization strategies, and cached per (content, strategy, target)
//! in a [`SummaryCache`]. [`DocumentPreprocessor`] ties the three together and
//! decides when a document needs reducing at all.

pub mod cache;
pub mod chunking;
pub mod preprocessor;
pub mod sqlite_cache;
pub mod strategy;

pub use cache::{CacheKey, CacheStats, MemorySummaryCache, SummaryCache, open_cache};
pub use chunking::{ChunkingEngine, DocumentChunk};
pub use preprocessor::{
    DocumentPreprocessor, PreprocessDecision, PreprocessedDocument, build_estimator,
};
pub use sqlite_cache::SqliteSummaryCache;
pub use strategy::{BackendSummarizer, StrategyContext, Summarizer, apply_strategy};
