//! Freshness rules for cached market data

use crate::core::cache::CacheEntry;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    Prices,
    Dividends,
    Returns,
    ExchangeRates,
    /// Gates full batch sweeps rather than individual entries.
    BatchCooldown,
}

impl DataCategory {
    pub const ALL: [DataCategory; 5] = [
        DataCategory::Prices,
        DataCategory::Dividends,
        DataCategory::Returns,
        DataCategory::ExchangeRates,
        DataCategory::BatchCooldown,
    ];

    pub fn default_ttl(&self) -> Duration {
        match self {
            DataCategory::Prices => Duration::hours(24),
            DataCategory::Dividends => Duration::days(30),
            DataCategory::Returns => Duration::days(30),
            DataCategory::ExchangeRates => Duration::hours(24),
            DataCategory::BatchCooldown => Duration::hours(6),
        }
    }
}

impl Display for DataCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataCategory::Prices => "prices",
                DataCategory::Dividends => "dividends",
                DataCategory::Returns => "returns",
                DataCategory::ExchangeRates => "exchange_rates",
                DataCategory::BatchCooldown => "batch_cooldown",
            }
        )
    }
}

#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    ttls: HashMap<DataCategory, Duration>,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            ttls: DataCategory::ALL
                .iter()
                .map(|c| (*c, c.default_ttl()))
                .collect(),
        }
    }
}

impl FreshnessPolicy {
    /// Default table with the given categories replaced.
    pub fn with_overrides(overrides: &HashMap<DataCategory, Duration>) -> Self {
        let mut policy = Self::default();
        policy.ttls.extend(overrides.iter().map(|(c, d)| (*c, *d)));
        policy
    }

    /// Builds a policy from an explicit table; categories left out are a configuration bug
    /// surfaced on first use.
    pub fn from_table(ttls: HashMap<DataCategory, Duration>) -> Self {
        Self { ttls }
    }

    /// # Panics
    ///
    /// Panics when `category` has no entry in the table.
    pub fn ttl(&self, category: DataCategory) -> Duration {
        match self.ttls.get(&category) {
            Some(ttl) => *ttl,
            None => panic!("freshness policy has no entry for category `{category}`"),
        }
    }

    pub fn is_fresh(&self, entry: &CacheEntry, category: DataCategory) -> bool {
        self.is_fresh_at(entry, category, Utc::now())
    }

    pub fn is_fresh_at(&self, entry: &CacheEntry, category: DataCategory, now: DateTime<Utc>) -> bool {
        entry.age_at(now) < self.ttl(category)
    }

    pub fn should_refresh(&self, last_update: Option<DateTime<Utc>>, category: DataCategory) -> bool {
        self.should_refresh_at(last_update, category, Utc::now())
    }

    pub fn should_refresh_at(
        &self,
        last_update: Option<DateTime<Utc>>,
        category: DataCategory,
        now: DateTime<Utc>,
    ) -> bool {
        match last_update {
            None => true,
            Some(ts) => now - ts > self.ttl(category),
        }
    }
}
