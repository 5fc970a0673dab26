mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore};

use crate::Result;
use crate::config::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_KEY_PREFIX};
use crate::report::Report;

/// Bounded persistent history of reports, keyed `<prefix><timestamp>`.
///
/// Holds at most `capacity` entries; the oldest are pruned first. Entries that
/// fail to parse are removed when the cache is loaded.
pub struct ReportCache<S: KeyValueStore> {
    store: S,
    capacity: usize,
    prefix: String,
}

impl<S: KeyValueStore> ReportCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_KEY_PREFIX)
    }

    pub fn with_capacity(store: S, capacity: usize, prefix: impl Into<String>) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            prefix: prefix.into(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key_for(&self, report: &Report) -> String {
        format!("{}{}", self.prefix, report.timestamp)
    }

    /// Persist a report, pruning the oldest entries so the cache never
    /// holds more than `capacity` reports
    pub fn save(&mut self, report: &Report) -> Result<String> {
        let key = self.key_for(report);
        let payload = serde_json::to_string(report)?;

        let mut keys = self.ordered_keys()?;
        if !keys.iter().any(|(k, _)| *k == key) {
            while keys.len() >= self.capacity {
                let (oldest, _) = keys.remove(0);
                tracing::debug!("Pruning cached report {}", oldest);
                self.store.remove(&oldest)?;
            }
        }

        self.store.set(&key, &payload)?;
        tracing::debug!("Cached report {}", key);
        Ok(key)
    }

    /// Load every cached report, most recent first.
    ///
    /// Malformed entries are dropped from the store and skipped.
    pub fn load(&mut self) -> Result<Vec<Report>> {
        let mut reports = Vec::new();
        let mut dropped = 0usize;

        for key in self.store.keys()? {
            let Some(suffix) = key.strip_prefix(&self.prefix) else {
                continue;
            };
            if suffix.parse::<i64>().is_err() {
                tracing::warn!("Dropping cache entry with malformed key {}", key);
                self.store.remove(&key)?;
                dropped += 1;
                continue;
            }

            let Some(content) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<Report>(&content) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::warn!("Dropping malformed cache entry {}: {}", key, e);
                    self.store.remove(&key)?;
                    dropped += 1;
                }
            }
        }

        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        tracing::info!(
            "Loaded {} cached reports ({} malformed entries dropped)",
            reports.len(),
            dropped
        );

        Ok(reports)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.ordered_keys()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&mut self) -> Result<()> {
        for (key, _) in self.ordered_keys()? {
            self.store.remove(&key)?;
        }
        Ok(())
    }

    /// Keys owned by this cache, oldest timestamp first
    fn ordered_keys(&self) -> Result<Vec<(String, i64)>> {
        let mut keys: Vec<(String, i64)> = self
            .store
            .keys()?
            .into_iter()
            .filter_map(|key| {
                let ts = key.strip_prefix(&self.prefix)?.parse::<i64>().ok()?;
                Some((key, ts))
            })
            .collect();
        keys.sort_by_key(|(_, ts)| *ts);
        Ok(keys)
    }
}
