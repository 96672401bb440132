//! Cache-aware access to market data: freshness checks, fetch, stale fallback and batch
//! pacing.

pub mod orchestrator;
pub mod status;

pub use orchestrator::{BatchOutcome, BatchReport, DataSource, MarketDataSync, Sourced};
pub use status::{StatusReport, StatusReporter};
