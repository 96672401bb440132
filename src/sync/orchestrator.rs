use crate::core::cache::{CacheEntry, CacheKey, CacheStore, Cacheable, EntryStatus};
use crate::core::config::SyncConfig;
use crate::core::currency::{ExchangeRateProvider, ExchangeRateSet};
use crate::core::fund::{FundDataProvider, FundMetrics};
use crate::core::policy::{DataCategory, FreshnessPolicy};
use crate::sync::status::{StatusReporter, read_last_batch_update};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Cache,
    Api,
    ExpiredCache,
}

impl Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataSource::Cache => "cache",
                DataSource::Api => "api",
                DataSource::ExpiredCache => "expired_cache",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub data: T,
    pub source: DataSource,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub from_cache: Vec<String>,
    pub from_api: Vec<String>,
    pub from_expired_cache: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchReport {
    fn record(&mut self, symbol: String, source: Option<DataSource>) {
        match source {
            Some(DataSource::Cache) => self.from_cache.push(symbol),
            Some(DataSource::Api) => self.from_api.push(symbol),
            Some(DataSource::ExpiredCache) => self.from_expired_cache.push(symbol),
            None => self.failed.push(symbol),
        }
    }

    pub fn total(&self) -> usize {
        self.from_cache.len() + self.from_api.len() + self.from_expired_cache.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The cooldown since `last_run` has not elapsed.
    Skipped { last_run: Option<DateTime<Utc>> },
    Completed(BatchReport),
}

/// Serves market data from the cache when fresh, otherwise fetches and writes through.
///
/// Every public method resolves to a value or `None`; fetch and store failures are
/// logged and absorbed here.
pub struct MarketDataSync {
    store: Arc<dyn CacheStore>,
    funds: Arc<dyn FundDataProvider>,
    rates: Arc<dyn ExchangeRateProvider>,
    policy: FreshnessPolicy,
    batch_size: usize,
    batch_delay: Duration,
    fetch_timeout: Duration,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    batch_lock: Mutex<()>,
}

impl MarketDataSync {
    pub fn new(
        store: Arc<dyn CacheStore>,
        funds: Arc<dyn FundDataProvider>,
        rates: Arc<dyn ExchangeRateProvider>,
        policy: FreshnessPolicy,
    ) -> Self {
        let defaults = SyncConfig::default();
        Self {
            store,
            funds,
            rates,
            policy,
            batch_size: defaults.batch_size,
            batch_delay: defaults.batch_delay(),
            fetch_timeout: defaults.fetch_timeout(),
            key_locks: Mutex::new(HashMap::new()),
            batch_lock: Mutex::new(()),
        }
    }

    pub fn from_config(
        config: &SyncConfig,
        store: Arc<dyn CacheStore>,
        funds: Arc<dyn FundDataProvider>,
        rates: Arc<dyn ExchangeRateProvider>,
    ) -> Result<Self> {
        Ok(Self::new(store, funds, rates, config.freshness_policy()?)
            .with_batching(config.batch_size, config.batch_delay())
            .with_fetch_timeout(config.fetch_timeout()))
    }

    pub fn with_batching(mut self, size: usize, delay: Duration) -> Self {
        self.batch_size = size.max(1);
        self.batch_delay = delay;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    pub fn status_reporter(&self) -> StatusReporter {
        StatusReporter::new(Arc::clone(&self.store))
    }

    pub async fn ensure_fund_data(&self, symbol: &str) -> Option<Sourced<FundMetrics>> {
        let funds = Arc::clone(&self.funds);
        let owned_symbol = symbol.to_string();
        self.ensure(CacheKey::fund(symbol), DataCategory::Prices, move || async move {
            funds.fetch_fund(&owned_symbol).await
        })
        .await
    }

    pub async fn ensure_exchange_rates(&self) -> Option<Sourced<ExchangeRateSet>> {
        let rates = Arc::clone(&self.rates);
        self.ensure(CacheKey::ExchangeRates, DataCategory::ExchangeRates, move || async move {
            rates.fetch_rates().await
        })
        .await
    }

    /// Live or cached rates, or the built-in table when nothing was ever fetched.
    pub async fn exchange_rates_or_fallback(&self) -> ExchangeRateSet {
        match self.ensure_exchange_rates().await {
            Some(sourced) => sourced.data,
            None => {
                warn!("No exchange rates available, using built-in table");
                ExchangeRateSet::fallback()
            }
        }
    }

    pub async fn batch_refresh(&self, symbols: &[String]) -> BatchOutcome {
        self.batch_refresh_with(symbols, false, &|_, _| ()).await
    }

    /// Refreshes `symbols` in groups of `batch_size`, pausing `batch_delay` between groups.
    ///
    /// `force` skips the cooldown gate but not the pacing. `on_symbol` runs as each symbol
    /// resolves.
    pub async fn batch_refresh_with(
        &self,
        symbols: &[String],
        force: bool,
        on_symbol: &(dyn Fn(&str, Option<DataSource>) + Sync),
    ) -> BatchOutcome {
        let _running = self.batch_lock.lock().await;

        let last_run = read_last_batch_update(self.store.as_ref()).await;
        if !force && !self.policy.should_refresh(last_run, DataCategory::BatchCooldown) {
            info!(?last_run, "Batch refresh skipped, cooldown active");
            return BatchOutcome::Skipped { last_run };
        }

        let groups: Vec<&[String]> = symbols.chunks(self.batch_size).collect();
        let group_count = groups.len();
        info!(symbols = symbols.len(), groups = group_count, "Starting batch refresh");

        let mut report = BatchReport::default();
        for (index, group) in groups.into_iter().enumerate() {
            debug!(group = index + 1, size = group.len(), "Refreshing group");
            let results = join_all(group.iter().map(|symbol| async move {
                let source = self.ensure_fund_data(symbol).await.map(|r| r.source);
                on_symbol(symbol, source);
                (symbol.clone(), source)
            }))
            .await;

            for (symbol, source) in results {
                report.record(symbol, source);
            }

            if index + 1 < group_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        // Partial failures still count as an attempt and re-arm the cooldown
        let now = Utc::now();
        self.store
            .put(
                &CacheKey::LastBatchUpdate,
                CacheEntry::at(Some(now.into_payload()), EntryStatus::Success, now),
            )
            .await;

        info!(
            cached = report.from_cache.len(),
            fetched = report.from_api.len(),
            stale = report.from_expired_cache.len(),
            failed = report.failed.len(),
            "Batch refresh complete"
        );
        BatchOutcome::Completed(report)
    }

    async fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        Arc::clone(locks.entry(key.storage_key()).or_default())
    }

    async fn ensure<T, F, Fut>(&self, key: CacheKey, category: DataCategory, fetch: F) -> Option<Sourced<T>>
    where
        T: Cacheable + Clone + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        // Concurrent callers for one key queue here and then see the winner's entry
        let guard = self.key_lock(&key).await.lock_owned().await;

        let previous = self.store.get(&key).await;
        if let Some(entry) = &previous {
            if self.policy.is_fresh(entry, category) {
                if let Some(data) = entry.usable_payload().cloned().and_then(T::from_payload) {
                    debug!(key = %key, "Serving fresh cache entry");
                    return Some(Sourced {
                        data,
                        source: DataSource::Cache,
                    });
                }
            }
        }

        // The refresh owns the key lock and runs to completion even if this caller is dropped,
        // so the in-progress marker is always replaced and a prior payload is never lost
        let store = Arc::clone(&self.store);
        let fetch_timeout = self.fetch_timeout;
        let task_key = key.clone();
        let refresh = tokio::spawn(async move {
            let _guard = guard;
            refresh_entry(store.as_ref(), &task_key, previous, fetch_timeout, fetch).await
        });

        match refresh.await {
            Ok(result) => result,
            Err(e) => {
                warn!(key = %key, error = %e, "Refresh task aborted");
                None
            }
        }
    }
}

/// Marks `key` in progress, fetches, then writes the outcome back.
async fn refresh_entry<T, F, Fut>(
    store: &dyn CacheStore,
    key: &CacheKey,
    previous: Option<CacheEntry>,
    fetch_timeout: Duration,
    fetch: F,
) -> Option<Sourced<T>>
where
    T: Cacheable + Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    store.put(key, CacheEntry::in_progress()).await;

    let result = match tokio::time::timeout(fetch_timeout, fetch()).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("Fetch timed out after {:?}", fetch_timeout)),
    };

    match result {
        Ok(data) => {
            info!(key = %key, "Fetched fresh data");
            store
                .put(key, CacheEntry::success(data.clone().into_payload()))
                .await;
            Some(Sourced {
                data,
                source: DataSource::Api,
            })
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Fetch failed");
            let fallback = previous.and_then(|entry| {
                let payload = entry.usable_payload()?.clone();
                let data = T::from_payload(payload.clone())?;
                Some((data, payload, entry.timestamp))
            });

            match fallback {
                Some((data, payload, written_at)) => {
                    warn!(key = %key, %written_at, "Serving expired cache entry");
                    // Keep the original timestamp so the entry stays stale
                    store
                        .put(
                            key,
                            CacheEntry::at(Some(payload), EntryStatus::StaleFallback, written_at),
                        )
                        .await;
                    Some(Sourced {
                        data,
                        source: DataSource::ExpiredCache,
                    })
                }
                None => {
                    store.put(key, CacheEntry::error()).await;
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::CachePayload;
    use crate::core::fund::HistoricalReturns;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn metrics(symbol: &str, price: f64) -> FundMetrics {
        FundMetrics {
            symbol: symbol.to_string(),
            current_price: price,
            currency: Some("GBP".to_string()),
            dividend_yield: 0.0,
            historical_returns: HistoricalReturns {
                one_year: 0.1,
                ..Default::default()
            },
            monthly_closes: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    fn rates(usd: f64) -> ExchangeRateSet {
        ExchangeRateSet {
            base: "GBP".to_string(),
            rates: BTreeMap::from([("USD".to_string(), usd)]),
            last_updated: Utc::now(),
        }
    }

    #[derive(Default)]
    struct MockFunds {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_all: AtomicBool,
        failing: HashSet<String>,
        delay: Option<Duration>,
        observed_status: std::sync::Mutex<Vec<Option<EntryStatus>>>,
        store: Option<Arc<MemoryStore>>,
    }

    impl MockFunds {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FundDataProvider for MockFunds {
        async fn fetch_fund(&self, symbol: &str) -> Result<FundMetrics> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

            if let Some(store) = &self.store {
                let status = store.get(&CacheKey::fund(symbol)).await.map(|e| e.status);
                self.observed_status.lock().unwrap().push(status);
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_all.load(Ordering::SeqCst) || self.failing.contains(symbol) {
                Err(anyhow!("Request error: upstream unavailable for symbol: {symbol}"))
            } else {
                Ok(metrics(symbol, 200.0))
            }
        }
    }

    #[derive(Default)]
    struct MockRates {
        calls: AtomicUsize,
        fail_all: AtomicBool,
    }

    #[async_trait]
    impl ExchangeRateProvider for MockRates {
        async fn fetch_rates(&self) -> Result<ExchangeRateSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all.load(Ordering::SeqCst) {
                Err(anyhow!("HTTP error: 503 Service Unavailable"))
            } else {
                Ok(rates(1.3))
            }
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        funds: Arc<MockFunds>,
        rates: Arc<MockRates>,
        sync: MarketDataSync,
    }

    fn harness(funds: MockFunds) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let funds = Arc::new(funds);
        let rates = Arc::new(MockRates::default());
        let sync = MarketDataSync::new(
            store.clone(),
            funds.clone(),
            rates.clone(),
            FreshnessPolicy::default(),
        );
        Harness {
            store,
            funds,
            rates,
            sync,
        }
    }

    async fn seed_fund(store: &MemoryStore, symbol: &str, price: f64, age: ChronoDuration) {
        let entry = CacheEntry::at(
            Some(metrics(symbol, price).into_payload()),
            EntryStatus::Success,
            Utc::now() - age,
        );
        store.put(&CacheKey::fund(symbol), entry).await;
    }

    fn symbols(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("SYM{i}")).collect()
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_fetch() {
        let h = harness(MockFunds::default());
        seed_fund(&h.store, "VWRL", 100.0, ChronoDuration::minutes(1)).await;

        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::Cache);
        assert_eq!(result.data.current_price, 100.0);
        assert_eq!(h.funds.calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_cache_refetches_and_persists() {
        let h = harness(MockFunds::default());
        seed_fund(&h.store, "VWRL", 100.0, ChronoDuration::hours(25)).await;

        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::Api);
        assert_eq!(result.data.current_price, 200.0);
        assert_eq!(h.funds.calls(), 1);

        let entry = h.store.get(&CacheKey::fund("VWRL")).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Success);
        assert!(entry.age_at(Utc::now()) < ChronoDuration::minutes(1));
        match entry.payload {
            Some(CachePayload::FundMetrics(m)) => assert_eq!(m.current_price, 200.0),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_cache_with_failed_fetch_serves_expired_entry() {
        let h = harness(MockFunds::default());
        h.funds.fail_all.store(true, Ordering::SeqCst);
        seed_fund(&h.store, "VWRL", 100.0, ChronoDuration::hours(25)).await;
        let seeded = h.store.get(&CacheKey::fund("VWRL")).await.unwrap();

        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::ExpiredCache);
        assert_eq!(result.data.current_price, 100.0);

        let entry = h.store.get(&CacheKey::fund("VWRL")).await.unwrap();
        assert_eq!(entry.status, EntryStatus::StaleFallback);
        assert_eq!(entry.payload, seeded.payload);
        assert_eq!(entry.timestamp, seeded.timestamp);
    }

    #[tokio::test]
    async fn test_fallback_ignores_entry_age() {
        let h = harness(MockFunds::default());
        h.funds.fail_all.store(true, Ordering::SeqCst);
        seed_fund(&h.store, "VWRL", 90.0, ChronoDuration::days(400)).await;

        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::ExpiredCache);
        assert_eq!(result.data.current_price, 90.0);

        // A second failure still finds the retained payload
        let again = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(again.source, DataSource::ExpiredCache);
        assert_eq!(h.funds.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_cache_and_failed_fetch_records_error() {
        let h = harness(MockFunds::default());
        h.funds.fail_all.store(true, Ordering::SeqCst);

        assert!(h.sync.ensure_fund_data("VWRL").await.is_none());

        let entry = h.store.get(&CacheKey::fund("VWRL")).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Error);
        assert!(entry.payload.is_none());
    }

    #[tokio::test]
    async fn test_error_entry_is_retried_next_call() {
        let h = harness(MockFunds::default());
        h.funds.fail_all.store(true, Ordering::SeqCst);
        assert!(h.sync.ensure_fund_data("VWRL").await.is_none());

        h.funds.fail_all.store(false, Ordering::SeqCst);
        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::Api);
        assert_eq!(h.funds.calls(), 2);
    }

    #[tokio::test]
    async fn test_in_progress_entry_is_never_a_hit() {
        let h = harness(MockFunds::default());
        h.store
            .put(&CacheKey::fund("VWRL"), CacheEntry::in_progress())
            .await;

        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::Api);
        assert_eq!(h.funds.calls(), 1);
    }

    #[tokio::test]
    async fn test_entry_marked_in_progress_during_fetch() {
        let store = Arc::new(MemoryStore::new());
        let funds = Arc::new(MockFunds {
            store: Some(store.clone()),
            ..Default::default()
        });
        let sync = MarketDataSync::new(
            store.clone(),
            funds.clone(),
            Arc::new(MockRates::default()),
            FreshnessPolicy::default(),
        );

        sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(
            *funds.observed_status.lock().unwrap(),
            vec![Some(EntryStatus::InProgress)]
        );
    }

    #[tokio::test]
    async fn test_wrong_payload_kind_is_a_miss() {
        let h = harness(MockFunds::default());
        h.store
            .put(
                &CacheKey::fund("VWRL"),
                CacheEntry::success(CachePayload::Timestamp(Utc::now())),
            )
            .await;
        h.funds.fail_all.store(true, Ordering::SeqCst);

        assert!(h.sync.ensure_fund_data("VWRL").await.is_none());
        assert_eq!(h.funds.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_calls_for_same_symbol_fetch_once() {
        let h = harness(MockFunds {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });

        let (a, b) = tokio::join!(h.sync.ensure_fund_data("VWRL"), h.sync.ensure_fund_data("VWRL"));
        let mut sources = vec![a.unwrap().source, b.unwrap().source];
        sources.sort_by_key(|s| s.to_string());
        assert_eq!(sources, vec![DataSource::Api, DataSource::Cache]);
        assert_eq!(h.funds.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_times_out_and_falls_back() {
        let h = harness(MockFunds {
            delay: Some(Duration::from_secs(120)),
            ..Default::default()
        });
        seed_fund(&h.store, "VWRL", 100.0, ChronoDuration::hours(30)).await;

        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::ExpiredCache);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_keeps_prior_payload() {
        let h = harness(MockFunds {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        seed_fund(&h.store, "VWRL", 100.0, ChronoDuration::hours(25)).await;

        // Caller gives up while the fetch is still running
        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), h.sync.ensure_fund_data("VWRL")).await;
        assert!(cancelled.is_err());
        h.funds.fail_all.store(true, Ordering::SeqCst);

        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::ExpiredCache);
        assert_eq!(result.data.current_price, 100.0);

        let entry = h.store.get(&CacheKey::fund("VWRL")).await.unwrap();
        assert_eq!(entry.status, EntryStatus::StaleFallback);
        assert!(entry.payload.is_some());
        assert_eq!(h.funds.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_still_writes_fetched_data() {
        let h = harness(MockFunds {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        });

        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), h.sync.ensure_fund_data("VWRL")).await;
        assert!(cancelled.is_err());
        tokio::time::sleep(Duration::from_secs(10)).await;

        let entry = h.store.get(&CacheKey::fund("VWRL")).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Success);
        let result = h.sync.ensure_fund_data("VWRL").await.unwrap();
        assert_eq!(result.source, DataSource::Cache);
        assert_eq!(h.funds.calls(), 1);
    }

    #[tokio::test]
    async fn test_exchange_rates_follow_same_shape() {
        let h = harness(MockFunds::default());

        let first = h.sync.ensure_exchange_rates().await.unwrap();
        assert_eq!(first.source, DataSource::Api);
        let second = h.sync.ensure_exchange_rates().await.unwrap();
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(h.rates.calls.load(Ordering::SeqCst), 1);

        // Age the entry past its ttl and make the provider fail
        let entry = h.store.get(&CacheKey::ExchangeRates).await.unwrap();
        h.store
            .put(
                &CacheKey::ExchangeRates,
                CacheEntry::at(entry.payload, EntryStatus::Success, Utc::now() - ChronoDuration::hours(25)),
            )
            .await;
        h.rates.fail_all.store(true, Ordering::SeqCst);

        let third = h.sync.ensure_exchange_rates().await.unwrap();
        assert_eq!(third.source, DataSource::ExpiredCache);
        assert_eq!(third.data.rate("USD"), Some(1.3));
    }

    #[tokio::test]
    async fn test_exchange_rates_fallback_table() {
        let h = harness(MockFunds::default());
        h.rates.fail_all.store(true, Ordering::SeqCst);

        let rates = h.sync.exchange_rates_or_fallback().await;
        assert_eq!(rates, ExchangeRateSet::fallback());
        let entry = h.store.get(&CacheKey::ExchangeRates).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_runs_in_paced_groups() {
        let h = harness(MockFunds {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let symbols = symbols(12);

        let started = tokio::time::Instant::now();
        let outcome = h.sync.batch_refresh(&symbols).await;
        let elapsed = started.elapsed();

        let BatchOutcome::Completed(report) = outcome else {
            panic!("batch should run on first call");
        };
        assert_eq!(report.from_api.len(), 12);
        assert_eq!(report.total(), 12);
        assert_eq!(h.funds.calls(), 12);
        assert_eq!(h.funds.max_in_flight.load(Ordering::SeqCst), 5);

        // Three groups, two pauses between them
        assert!(elapsed >= Duration::from_millis(2300));
        assert!(elapsed < Duration::from_millis(3300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_group_does_not_pause() {
        let h = harness(MockFunds::default());
        let started = tokio::time::Instant::now();
        h.sync.batch_refresh(&symbols(5)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_batch_cooldown_gate() {
        let h = harness(MockFunds::default());
        let symbols = symbols(3);

        assert!(matches!(
            h.sync.batch_refresh(&symbols).await,
            BatchOutcome::Completed(_)
        ));
        assert_eq!(h.funds.calls(), 3);

        let second = h.sync.batch_refresh(&symbols).await;
        assert!(matches!(second, BatchOutcome::Skipped { last_run: Some(_) }));
        assert_eq!(h.funds.calls(), 3);
    }

    #[tokio::test]
    async fn test_batch_runs_again_after_cooldown() {
        let h = harness(MockFunds::default());
        let seven_hours_ago = Utc::now() - ChronoDuration::hours(7);
        h.store
            .put(
                &CacheKey::LastBatchUpdate,
                CacheEntry::at(
                    Some(seven_hours_ago.into_payload()),
                    EntryStatus::Success,
                    seven_hours_ago,
                ),
            )
            .await;

        assert!(matches!(
            h.sync.batch_refresh(&symbols(2)).await,
            BatchOutcome::Completed(_)
        ));
        let last = h.sync.status_reporter().last_batch_update().await.unwrap();
        assert!(last > seven_hours_ago);
    }

    #[tokio::test]
    async fn test_forced_batch_ignores_cooldown() {
        let h = harness(MockFunds::default());
        let symbols = symbols(2);
        h.sync.batch_refresh(&symbols).await;

        // Entries are fresh now, so a forced run is served from cache
        let outcome = h.sync.batch_refresh_with(&symbols, true, &|_, _| ()).await;
        let BatchOutcome::Completed(report) = outcome else {
            panic!("forced batch should run");
        };
        assert_eq!(report.from_cache.len(), 2);
        assert_eq!(h.funds.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_partial_failure_still_rearms_cooldown() {
        let h = harness(MockFunds {
            failing: HashSet::from(["SYM1".to_string(), "SYM6".to_string()]),
            ..Default::default()
        });
        seed_fund(&h.store, "SYM6", 50.0, ChronoDuration::days(2)).await;
        let symbols = symbols(8);

        let BatchOutcome::Completed(report) = h.sync.batch_refresh(&symbols).await else {
            panic!("batch should run");
        };
        assert_eq!(report.failed, vec!["SYM1".to_string()]);
        assert_eq!(report.from_expired_cache, vec!["SYM6".to_string()]);
        assert_eq!(report.from_api.len(), 6);
        assert_eq!(h.funds.calls(), 8);

        assert!(h.sync.status_reporter().last_batch_update().await.is_some());
        assert!(matches!(
            h.sync.batch_refresh(&symbols).await,
            BatchOutcome::Skipped { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_progress_callback_sees_every_symbol() {
        let h = harness(MockFunds::default());
        let seen = std::sync::Mutex::new(Vec::new());
        h.sync
            .batch_refresh_with(&symbols(7), false, &|symbol, source| {
                seen.lock().unwrap().push((symbol.to_string(), source));
            })
            .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 7);
        assert!(seen.iter().all(|(_, s)| *s == Some(DataSource::Api)));
    }

    #[tokio::test]
    async fn test_empty_batch_still_records_run() {
        let h = harness(MockFunds::default());
        assert!(matches!(
            h.sync.batch_refresh(&[]).await,
            BatchOutcome::Completed(ref r) if r.total() == 0
        ));
        assert!(h.sync.status_reporter().last_batch_update().await.is_some());
    }
}
