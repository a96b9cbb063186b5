// src/services/cache.rs
//
// File-backed key -> {content, expiry} store shared by every fetch in a run.
use chrono::{DateTime, Duration, Utc};
use log::debug;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::{Result, ScreenerError};
use crate::services::metrics::{Metric, Metrics};

const SECTOR_PREFIX: &str = "sector__";
const SHARE_COUNT_PREFIX: &str = "share_count__";

/// What a cached page was fetched for. Decides the key prefix and the TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCategory {
    Financials,
    ShareCount,
    Sector,
}

impl CacheCategory {
    pub fn key(&self, url: &str) -> String {
        match self {
            CacheCategory::Financials => url.to_string(),
            CacheCategory::ShareCount => format!("{}{}", SHARE_COUNT_PREFIX, url),
            CacheCategory::Sector => format!("{}{}", SECTOR_PREFIX, url),
        }
    }

    pub fn of_key(key: &str) -> Self {
        if key.starts_with(SECTOR_PREFIX) {
            CacheCategory::Sector
        } else if key.starts_with(SHARE_COUNT_PREFIX) {
            CacheCategory::ShareCount
        } else {
            CacheCategory::Financials
        }
    }

    pub fn ttl_days(&self) -> RangeInclusive<i64> {
        match self {
            CacheCategory::Financials | CacheCategory::ShareCount => 15..=30,
            CacheCategory::Sector => 150..=300,
        }
    }

    /// Randomized so that a whole universe fetched on one day does not expire on one day.
    pub fn random_ttl(&self) -> Duration {
        Duration::days(rand::thread_rng().gen_range(self.ttl_days()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: Value,
    /// Absolute expiry, unix seconds.
    pub expiry: f64,
}

impl CacheEntry {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry > unix_seconds(now)
    }
}

pub fn unix_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

fn seconds(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

/// Bring a stored value into the `{content, expiry}` shape.
///
/// Returns the metric describing the rewrite, or `None` when the value was
/// already canonical.
pub fn normalize_entry(key: &str, raw: Value, now: DateTime<Utc>) -> (CacheEntry, Option<Metric>) {
    let mut fields = match raw {
        Value::Object(fields) if fields.contains_key("content") => fields,
        other => return (fresh_expiry(key, other, now), Some(Metric::AddedExpiryToEntry)),
    };
    let expiry = fields.get("expiry").and_then(Value::as_f64);
    let ttl = fields.get("ttl").and_then(Value::as_f64);
    let content = fields.remove("content").unwrap_or(Value::Null);

    match (expiry, ttl) {
        (Some(expiry), _) => (CacheEntry { content, expiry }, None),
        (None, Some(ttl)) => (
            CacheEntry { content, expiry: unix_seconds(now) + ttl },
            Some(Metric::ConvertedTTLToExpiryInEntry),
        ),
        (None, None) => (fresh_expiry(key, content, now), Some(Metric::AddedExpiryToEntry)),
    }
}

fn fresh_expiry(key: &str, content: Value, now: DateTime<Utc>) -> CacheEntry {
    let ttl = CacheCategory::of_key(key).random_ttl();
    CacheEntry { content, expiry: unix_seconds(now) + seconds(ttl) }
}

/// Durable cache in a single SQLite file.
///
/// The connection is held for the lifetime of the value and released on drop,
/// so opening the cache at the top of a run scopes it to that run.
pub struct ExpiringCache {
    conn: Connection,
}

impl ExpiringCache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Close the file and surface any error from the final flush.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| ScreenerError::Database(e))
    }

    fn load_raw(&self, key: &str) -> Result<Option<Value>> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn store_raw(&self, key: &str, value: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cache_entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, serde_json::to_string(value)?],
        )?;
        Ok(())
    }

    fn load(&self, key: &str, metrics: &mut Metrics) -> Result<Option<(CacheEntry, bool)>> {
        let raw = match self.load_raw(key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let (entry, migration) = normalize_entry(key, raw, Utc::now());
        if let Some(metric) = migration {
            debug!("Migrated legacy cache entry {} ({})", key, metric.name());
            self.store_raw(key, &serde_json::to_value(&entry)?)?;
            metrics.incr(metric);
        }
        Ok(Some((entry, migration.is_some())))
    }

    /// Read an entry whatever its freshness, migrating a legacy record in place.
    pub fn entry(&self, key: &str, metrics: &mut Metrics) -> Result<Option<CacheEntry>> {
        Ok(self.load(key, metrics)?.map(|(entry, _)| entry))
    }

    /// Bring the record under `key` into canonical shape.
    ///
    /// `None` if the key is absent, otherwise whether the record had to be rewritten.
    pub fn migrate(&self, key: &str, metrics: &mut Metrics) -> Result<Option<bool>> {
        Ok(self.load(key, metrics)?.map(|(_, migrated)| migrated))
    }

    pub fn contains(&self, key: &str, metrics: &mut Metrics) -> Result<bool> {
        Ok(self
            .entry(key, metrics)?
            .map(|entry| entry.is_fresh_at(Utc::now()))
            .unwrap_or(false))
    }

    pub fn get(&self, key: &str, metrics: &mut Metrics) -> Result<Value> {
        match self.entry(key, metrics)? {
            Some(entry) if entry.is_fresh_at(Utc::now()) => Ok(entry.content),
            Some(_) => Err(ScreenerError::Expired(key.to_string())),
            None => Err(ScreenerError::KeyNotFound(key.to_string())),
        }
    }

    pub fn put(&self, key: &str, content: Value, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            content,
            expiry: unix_seconds(Utc::now()) + seconds(ttl),
        };
        self.store_raw(key, &serde_json::to_value(&entry)?)
    }
}
