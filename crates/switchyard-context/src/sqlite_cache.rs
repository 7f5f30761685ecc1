// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed summary store.
//!
//! Rows follow the persisted entry layout `{key, value, created_at,
//! ttl_seconds}` with `created_at` as RFC 3339 UTC text. All statements run
//! on tokio-rusqlite's single background thread.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use rusqlite::types::Value;
use tracing::debug;

use switchyard_core::SwitchyardError;

use crate::cache::{CacheCounters, CacheKey, CacheStats, SummaryCache};

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    CREATE TABLE IF NOT EXISTS summary_cache (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL,
        created_at TEXT NOT NULL,
        ttl_seconds INTEGER NOT NULL
    );
";

/// How far ahead of this host's clock a row's `created_at` may be and still
/// count as fresh.
const CLOCK_SKEW: Duration = Duration::from_secs(5);

/// Convert a tokio-rusqlite error into SwitchyardError::Storage.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SwitchyardError {
    SwitchyardError::Storage {
        source: Box::new(e),
    }
}

/// A stored row before validation.
type RawRow = (Value, Value, Value);

/// Validated row contents.
struct StoredEntry {
    value: String,
    created_at: DateTime<Utc>,
    ttl: Duration,
}

impl StoredEntry {
    fn parse(row: RawRow) -> Result<Self, String> {
        let (value, created_at, ttl) = row;
        let value = match value {
            Value::Text(s) => s,
            other => return Err(format!("value has type {}", other.data_type())),
        };
        let created_at = match created_at {
            Value::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map_err(|e| format!("created_at {s:?}: {e}"))?
                .with_timezone(&Utc),
            other => return Err(format!("created_at has type {}", other.data_type())),
        };
        let ttl = match ttl {
            Value::Integer(secs) if secs >= 0 => Duration::from_secs(secs as u64),
            other => return Err(format!("invalid ttl_seconds {other:?}")),
        };
        Ok(Self {
            value,
            created_at,
            ttl,
        })
    }

    /// A row stamped further ahead than [`CLOCK_SKEW`] reads as expired.
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.created_at).to_std() {
            Ok(age) => age <= self.ttl,
            Err(_) => self
                .created_at
                .signed_duration_since(now)
                .to_std()
                .is_ok_and(|ahead| ahead <= CLOCK_SKEW),
        }
    }
}

/// Summary store persisted in a SQLite database file.
pub struct SqliteSummaryCache {
    conn: tokio_rusqlite::Connection,
    counters: CacheCounters,
}

impl std::fmt::Debug for SqliteSummaryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSummaryCache").finish_non_exhaustive()
    }
}

impl SqliteSummaryCache {
    /// Open (or create) the database at `path` and ensure the table exists.
    pub async fn open(path: &str) -> Result<Self, SwitchyardError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| SwitchyardError::Storage {
                        source: Box::new(e),
                    })?;
            }
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SwitchyardError::Storage {
                source: Box::new(e),
            })?;
        Self::with_connection(conn).await
    }

    /// Use an existing connection, creating the table if needed.
    pub async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self, SwitchyardError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!("summary cache table ready");
        Ok(Self {
            conn,
            counters: CacheCounters::default(),
        })
    }

    async fn read_row(&self, key: &str) -> Result<Option<RawRow>, SwitchyardError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<RawRow>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value, created_at, ttl_seconds FROM summary_cache WHERE key = ?1",
                    rusqlite::params![key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete(&self, key: &str) -> Result<bool, SwitchyardError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let n = conn.execute(
                    "DELETE FROM summary_cache WHERE key = ?1",
                    rusqlite::params![key],
                )?;
                Ok(n > 0)
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl SummaryCache for SqliteSummaryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, SwitchyardError> {
        let Some(row) = self.read_row(key.as_str()).await? else {
            self.counters.miss();
            return Ok(None);
        };

        let entry = match StoredEntry::parse(row) {
            Ok(entry) => entry,
            Err(message) => {
                self.counters.corrupt();
                return Err(SwitchyardError::CacheCorruption {
                    key: key.to_string(),
                    message,
                });
            }
        };

        if entry.is_live(Utc::now()) {
            self.counters.hit();
            Ok(Some(entry.value))
        } else {
            self.counters.miss();
            self.delete(key.as_str()).await?;
            debug!(key = %key, "expired summary removed");
            Ok(None)
        }
    }

    async fn put(&self, key: &CacheKey, summary: &str, ttl: Duration) -> Result<(), SwitchyardError> {
        let key = key.to_string();
        let summary = summary.to_string();
        let now = Utc::now();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        let written = self
            .conn
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let tx = conn.transaction()?;
                let existing: Option<RawRow> = tx
                    .query_row(
                        "SELECT value, created_at, ttl_seconds FROM summary_cache WHERE key = ?1",
                        rusqlite::params![key],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;
                let live = existing
                    .and_then(|row| StoredEntry::parse(row).ok())
                    .is_some_and(|entry| entry.is_live(now));
                if live {
                    return Ok(false);
                }
                tx.execute(
                    "INSERT OR REPLACE INTO summary_cache (key, value, created_at, ttl_seconds) \
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![key, summary, now.to_rfc3339(), ttl_secs],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(map_tr_err)?;

        if !written {
            debug!("live summary already stored, keeping it");
        }
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<bool, SwitchyardError> {
        self.delete(key.as_str()).await
    }

    async fn clear(&self) -> Result<(), SwitchyardError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM summary_cache", [])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn stats(&self) -> Result<CacheStats, SwitchyardError> {
        let rows: Vec<RawRow> = self
            .conn
            .call(|conn| -> Result<Vec<RawRow>, rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT value, created_at, ttl_seconds FROM summary_cache")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;
        let now = Utc::now();
        let live = rows
            .into_iter()
            .filter_map(|row| StoredEntry::parse(row).ok())
            .filter(|entry| entry.is_live(now))
            .count() as u64;
        Ok(self.counters.stats(live))
    }
}
