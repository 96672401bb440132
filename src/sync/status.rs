//! Read-only view of cache metadata for display.

use crate::core::cache::{CacheEntry, CacheKey, CacheStore, Cacheable, EntryStatus};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: EntryStatus,
    pub last_update_time: DateTime<Utc>,
    pub age: Duration,
}

impl StatusReport {
    pub fn from_entry(entry: &CacheEntry, now: DateTime<Utc>) -> Self {
        Self {
            status: entry.status,
            last_update_time: entry.timestamp,
            // Clock skew between writes and reads should not show negative ages
            age: entry.age_at(now).max(Duration::zero()),
        }
    }
}

/// Reads the time of the last completed batch sweep.
pub(crate) async fn read_last_batch_update(store: &dyn CacheStore) -> Option<DateTime<Utc>> {
    let entry = store.get(&CacheKey::LastBatchUpdate).await?;
    entry
        .usable_payload()
        .cloned()
        .and_then(DateTime::<Utc>::from_payload)
        .or(Some(entry.timestamp))
}

#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn CacheStore>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn get_status(&self, symbol: &str) -> Option<StatusReport> {
        self.report(&CacheKey::fund(symbol)).await
    }

    pub async fn exchange_rate_status(&self) -> Option<StatusReport> {
        self.report(&CacheKey::ExchangeRates).await
    }

    pub async fn last_batch_update(&self) -> Option<DateTime<Utc>> {
        read_last_batch_update(self.store.as_ref()).await
    }

    async fn report(&self, key: &CacheKey) -> Option<StatusReport> {
        let entry = self.store.get(key).await?;
        Some(StatusReport::from_entry(&entry, Utc::now()))
    }
}
