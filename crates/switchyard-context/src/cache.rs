// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Summary cache contract, key derivation, and the in-memory store.
//!
//! Entries are immutable: `put` on a key holding a live entry is a no-op, and
//! only an absent or expired key is written. An expired entry reads as a miss.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;

use switchyard_config::model::{CacheBackend, CacheConfig};
use switchyard_core::{SummaryStrategy, SwitchyardError};

use crate::sqlite_cache::SqliteSummaryCache;

/// Deterministic cache key over (normalized content, strategy, target backend).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hex SHA-256 of the normalized content, strategy and backend id,
    /// NUL-separated.
    pub fn derive(content: &str, strategy: SummaryStrategy, backend: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_content(content).as_bytes());
        hasher.update([0u8]);
        hasher.update(strategy.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(backend.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Line endings unified to `\n`, trailing whitespace on each line and
/// surrounding blank space removed.
pub fn normalize_content(content: &str) -> String {
    content
        .replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live entries currently stored.
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    /// Reads that found an unreadable entry.
    pub corrupt: u64,
}

/// Lookup counters shared by the store implementations.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    corrupt: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn corrupt(&self) {
        self.corrupt.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stats(&self, entries: u64) -> CacheStats {
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
        }
    }
}

/// Storage contract for document summaries.
#[async_trait]
pub trait SummaryCache: Send + Sync + fmt::Debug {
    /// The summary stored under `key`, or `None` if absent or expired.
    ///
    /// Fails with `CacheCorruption` when the stored entry is unreadable.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, SwitchyardError>;

    /// Store `summary` under `key` unless a live entry already exists.
    async fn put(&self, key: &CacheKey, summary: &str, ttl: Duration) -> Result<(), SwitchyardError>;

    /// Remove `key`. Returns whether an entry was present.
    async fn invalidate(&self, key: &CacheKey) -> Result<bool, SwitchyardError>;

    async fn clear(&self) -> Result<(), SwitchyardError>;

    async fn stats(&self) -> Result<CacheStats, SwitchyardError>;
}

/// Open the store selected by `config.backend`.
pub async fn open_cache(config: &CacheConfig) -> Result<Arc<dyn SummaryCache>, SwitchyardError> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemorySummaryCache::new(config.max_entries))),
        CacheBackend::Sqlite => Ok(Arc::new(SqliteSummaryCache::open(&config.database_path).await?)),
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    summary: String,
    stored_at: Instant,
    ttl: Duration,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) <= self.ttl
    }
}

/// Process-local summary store bounded by entry count.
///
/// When full, expired entries are purged first, then the oldest entry is
/// evicted.
#[derive(Debug)]
pub struct MemorySummaryCache {
    entries: DashMap<String, MemoryEntry>,
    max_entries: usize,
    counters: CacheCounters,
}

impl MemorySummaryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            counters: CacheCounters::default(),
        }
    }

    fn make_room(&self, now: Instant) {
        if self.entries.len() < self.max_entries {
            return;
        }
        self.entries.retain(|_, e| e.is_live(now));
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.stored_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    debug!(key = %key, "evicted oldest summary");
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl SummaryCache for MemorySummaryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, SwitchyardError> {
        let now = Instant::now();
        let found = self
            .entries
            .get(key.as_str())
            .filter(|e| e.is_live(now))
            .map(|e| e.summary.clone());
        if found.is_some() {
            self.counters.hit();
        } else {
            self.entries.remove_if(key.as_str(), |_, e| !e.is_live(now));
            self.counters.miss();
        }
        Ok(found)
    }

    async fn put(&self, key: &CacheKey, summary: &str, ttl: Duration) -> Result<(), SwitchyardError> {
        let now = Instant::now();
        if self
            .entries
            .get(key.as_str())
            .is_some_and(|e| e.is_live(now))
        {
            debug!(key = %key, "live summary already cached, keeping it");
            return Ok(());
        }
        self.make_room(now);
        self.entries.insert(
            key.as_str().to_string(),
            MemoryEntry {
                summary: summary.to_string(),
                stored_at: now,
                ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<bool, SwitchyardError> {
        Ok(self.entries.remove(key.as_str()).is_some())
    }

    async fn clear(&self) -> Result<(), SwitchyardError> {
        self.entries.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, SwitchyardError> {
        let now = Instant::now();
        let live = self.entries.iter().filter(|e| e.is_live(now)).count() as u64;
        Ok(self.counters.stats(live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn key_is_deterministic_and_input_sensitive() {
        let k = CacheKey::derive("doc", SummaryStrategy::Hybrid, "gpt-4o");
        assert_eq!(k, CacheKey::derive("doc", SummaryStrategy::Hybrid, "gpt-4o"));
        assert_eq!(k.as_str().len(), 64);
        assert_ne!(k, CacheKey::derive("doc", SummaryStrategy::Extractive, "gpt-4o"));
        assert_ne!(k, CacheKey::derive("doc", SummaryStrategy::Hybrid, "gpt-4o-mini"));
        assert_ne!(k, CacheKey::derive("doc2", SummaryStrategy::Hybrid, "gpt-4o"));
    }

    #[test]
    fn key_ignores_insignificant_whitespace() {
        let a = CacheKey::derive("line one\r\nline two  \n", SummaryStrategy::Semantic, "m");
        let b = CacheKey::derive("\nline one\nline two", SummaryStrategy::Semantic, "m");
        assert_eq!(a, b);
    }

    #[test]
    fn field_separator_prevents_ambiguity() {
        let a = CacheKey::derive("ab", SummaryStrategy::Hybrid, "c");
        let b = CacheKey::derive("a", SummaryStrategy::Hybrid, "bc");
        assert_ne!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn get_after_put_hits_until_ttl() {
        let cache = MemorySummaryCache::new(10);
        let key = CacheKey::derive("doc", SummaryStrategy::Hybrid, "m");
        assert_eq!(cache.get(&key).await.unwrap(), None);

        cache.put(&key, "summary", TTL).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("summary"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn live_entries_are_immutable() {
        let cache = MemorySummaryCache::new(10);
        let key = CacheKey::derive("doc", SummaryStrategy::Hybrid, "m");
        cache.put(&key, "first", TTL).await.unwrap();
        cache.put(&key, "second", TTL).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("first"));

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.put(&key, "third", TTL).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("third"));
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_evicts_oldest() {
        let cache = MemorySummaryCache::new(2);
        let keys: Vec<_> = (0..3)
            .map(|i| CacheKey::derive(&format!("doc {i}"), SummaryStrategy::Hybrid, "m"))
            .collect();
        for key in &keys {
            cache.put(key, "s", TTL).await.unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert_eq!(cache.get(&keys[0]).await.unwrap(), None);
        assert!(cache.get(&keys[1]).await.unwrap().is_some());
        assert!(cache.get(&keys[2]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let cache = MemorySummaryCache::new(10);
        let a = CacheKey::derive("a", SummaryStrategy::Hybrid, "m");
        let b = CacheKey::derive("b", SummaryStrategy::Hybrid, "m");
        cache.put(&a, "sa", TTL).await.unwrap();
        cache.put(&b, "sb", TTL).await.unwrap();

        assert!(cache.invalidate(&a).await.unwrap());
        assert!(!cache.invalidate(&a).await.unwrap());
        assert_eq!(cache.stats().await.unwrap().entries, 1);

        cache.clear().await.unwrap();
        assert_eq!(cache.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn memory_backend_is_selected_by_config() {
        let cache = open_cache(&CacheConfig::default()).await.unwrap();
        assert_eq!(cache.stats().await.unwrap(), CacheStats::default());
    }
}
