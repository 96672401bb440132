//! Cache entry model and the store abstraction shared by every backend.

use crate::core::currency::ExchangeRateSet;
use crate::core::fund::FundMetrics;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const FUND_DATA_PREFIX: &str = "FUND_DATA_";
const EXCHANGE_RATES_KEY: &str = "EXCHANGE_RATES_CACHE";
const LAST_BATCH_UPDATE_KEY: &str = "LAST_BATCH_UPDATE";

/// Identifies one persisted record. The storage form is stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    FundData(String),
    ExchangeRates,
    LastBatchUpdate,
}

impl CacheKey {
    pub fn fund(symbol: &str) -> Self {
        CacheKey::FundData(symbol.to_string())
    }

    pub fn storage_key(&self) -> String {
        match self {
            CacheKey::FundData(symbol) => format!("{FUND_DATA_PREFIX}{symbol}"),
            CacheKey::ExchangeRates => EXCHANGE_RATES_KEY.to_string(),
            CacheKey::LastBatchUpdate => LAST_BATCH_UPDATE_KEY.to_string(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Success,
    Error,
    InProgress,
    /// A refresh failed and the previous payload was served in its place.
    StaleFallback,
}

impl Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EntryStatus::Success => "success",
                EntryStatus::Error => "error",
                EntryStatus::InProgress => "in progress",
                EntryStatus::StaleFallback => "stale fallback",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CachePayload {
    FundMetrics(FundMetrics),
    ExchangeRates(ExchangeRateSet),
    Timestamp(#[serde(with = "chrono::serde::ts_milliseconds")] DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: Option<CachePayload>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub status: EntryStatus,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(payload: Option<CachePayload>, status: EntryStatus) -> Self {
        Self::at(payload, status, Utc::now())
    }

    pub fn at(payload: Option<CachePayload>, status: EntryStatus, timestamp: DateTime<Utc>) -> Self {
        // InProgress markers never carry data
        let payload = match status {
            EntryStatus::InProgress => None,
            _ => payload,
        };
        Self {
            payload,
            timestamp,
            status,
        }
    }

    pub fn success(payload: CachePayload) -> Self {
        Self::new(Some(payload), EntryStatus::Success)
    }

    pub fn in_progress() -> Self {
        Self::new(None, EntryStatus::InProgress)
    }

    pub fn error() -> Self {
        Self::new(None, EntryStatus::Error)
    }

    /// Payload usable as a cache hit or a fallback.
    pub fn usable_payload(&self) -> Option<&CachePayload> {
        match self.status {
            EntryStatus::InProgress => None,
            _ => self.payload.as_ref(),
        }
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

/// Typed view over [`CachePayload`] so a key holding the wrong category reads as a miss.
pub trait Cacheable: Sized {
    fn into_payload(self) -> CachePayload;
    fn from_payload(payload: CachePayload) -> Option<Self>;
}

impl Cacheable for FundMetrics {
    fn into_payload(self) -> CachePayload {
        CachePayload::FundMetrics(self)
    }

    fn from_payload(payload: CachePayload) -> Option<Self> {
        match payload {
            CachePayload::FundMetrics(metrics) => Some(metrics),
            _ => None,
        }
    }
}

impl Cacheable for ExchangeRateSet {
    fn into_payload(self) -> CachePayload {
        CachePayload::ExchangeRates(self)
    }

    fn from_payload(payload: CachePayload) -> Option<Self> {
        match payload {
            CachePayload::ExchangeRates(rates) => Some(rates),
            _ => None,
        }
    }
}

impl Cacheable for DateTime<Utc> {
    fn into_payload(self) -> CachePayload {
        CachePayload::Timestamp(self)
    }

    fn from_payload(payload: CachePayload) -> Option<Self> {
        match payload {
            CachePayload::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }
}

/// Persistent key/value store for cache entries.
///
/// Implementations swallow their own I/O and decoding failures: a failed read is a miss
/// and a failed write is logged and dropped.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Overwrites whatever is stored under `key`.
    async fn put(&self, key: &CacheKey, entry: CacheEntry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_are_stable() {
        assert_eq!(CacheKey::fund("VWRL").storage_key(), "FUND_DATA_VWRL");
        assert_eq!(CacheKey::ExchangeRates.storage_key(), "EXCHANGE_RATES_CACHE");
        assert_eq!(CacheKey::LastBatchUpdate.storage_key(), "LAST_BATCH_UPDATE");
    }

    #[test]
    fn test_in_progress_entry_drops_payload() {
        let payload = CachePayload::Timestamp(Utc::now());
        let entry = CacheEntry::at(Some(payload), EntryStatus::InProgress, Utc::now());
        assert!(entry.payload.is_none());
        assert!(entry.usable_payload().is_none());
    }

    #[test]
    fn test_entry_serializes_three_fields() {
        let ts = Utc::now();
        let entry = CacheEntry::at(
            Some(CachePayload::Timestamp(ts)),
            EntryStatus::Success,
            ts,
        );
        let value = serde_json::to_value(&entry).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["status"], "success");
        assert_eq!(object["timestamp"], ts.timestamp_millis());
        assert_eq!(object["payload"]["kind"], "timestamp");

        let decoded: CacheEntry = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.status, EntryStatus::Success);
        assert_eq!(decoded.timestamp.timestamp_millis(), ts.timestamp_millis());
    }

    #[test]
    fn test_payload_kind_mismatch_reads_as_none() {
        let payload = CachePayload::Timestamp(Utc::now());
        assert!(FundMetrics::from_payload(payload.clone()).is_none());
        assert!(ExchangeRateSet::from_payload(payload.clone()).is_none());
        assert!(DateTime::<Utc>::from_payload(payload).is_some());
    }
}
