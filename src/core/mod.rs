//! Core business logic abstractions

pub mod analytics;
pub mod cache;
pub mod config;
pub mod currency;
pub mod fund;
pub mod log;
pub mod policy;
pub mod projection;

// Re-export main types for cleaner imports
pub use cache::{CacheEntry, CacheKey, CachePayload, CacheStore, Cacheable, EntryStatus};
pub use currency::{ExchangeRateProvider, ExchangeRateSet};
pub use fund::{FundDataProvider, FundMetrics, HistoricalReturns, ReturnPeriod};
pub use policy::{DataCategory, FreshnessPolicy};
