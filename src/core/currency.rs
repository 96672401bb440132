//! Exchange rate sets and the fetcher abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// True for pence-denominated quotes. Yahoo reports London listings as `GBp`, some feeds
/// use `GBX`.
pub fn is_pence(currency: &str) -> bool {
    currency == "GBp" || currency.eq_ignore_ascii_case("GBX")
}

/// Case-insensitive match that keeps pence and pounds apart.
pub fn same_currency(a: &str, b: &str) -> bool {
    if is_pence(a) || is_pence(b) {
        return is_pence(a) && is_pence(b);
    }
    a.eq_ignore_ascii_case(b)
}

/// Rates quoted as units of each currency per one unit of `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateSet {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
    pub last_updated: DateTime<Utc>,
}

impl ExchangeRateSet {
    /// Built-in USD table used when no live rates have ever been fetched.
    pub fn fallback() -> Self {
        Self {
            base: "USD".to_string(),
            rates: BTreeMap::from([("GBP".to_string(), 0.79), ("ZAR".to_string(), 18.73)]),
            last_updated: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        if is_pence(currency) {
            return self.rate("GBP").map(|r| r * 100.0);
        }
        if currency.eq_ignore_ascii_case(&self.base) {
            return Some(1.0);
        }
        self.rates
            .get(&currency.to_uppercase())
            .copied()
            .filter(|r| *r > 0.0)
    }

    /// Converts through the base currency.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        if same_currency(from, to) {
            return Some(amount);
        }
        let in_base = amount / self.rate(from)?;
        Some(in_base * self.rate(to)?)
    }
}

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn fetch_rates(&self) -> Result<ExchangeRateSet>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gbp_rates() -> ExchangeRateSet {
        ExchangeRateSet {
            base: "GBP".to_string(),
            rates: BTreeMap::from([("USD".to_string(), 1.25), ("ZAR".to_string(), 23.5)]),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_convert_via_base() {
        let rates = gbp_rates();
        assert_eq!(rates.convert(100.0, "GBP", "USD"), Some(125.0));
        assert_eq!(rates.convert(125.0, "USD", "GBP"), Some(100.0));
        let zar = rates.convert(125.0, "usd", "ZAR").unwrap();
        assert!((zar - 2350.0).abs() < 1e-9);
    }

    #[test]
    fn test_convert_unknown_currency() {
        let rates = gbp_rates();
        assert!(rates.convert(1.0, "GBP", "JPY").is_none());
        assert_eq!(rates.convert(1.0, "JPY", "JPY"), Some(1.0));
    }

    #[test]
    fn test_pence_quotes_convert_to_pounds() {
        let rates = gbp_rates();
        assert_eq!(rates.rate("GBp"), Some(100.0));
        assert_eq!(rates.rate("GBX"), Some(100.0));
        assert_eq!(rates.convert(9050.0, "GBp", "GBP"), Some(90.5));
        let usd = rates.convert(9050.0, "GBp", "USD").unwrap();
        assert!((usd - 113.125).abs() < 1e-9);
        assert_eq!(rates.convert(10.0, "GBP", "GBX"), Some(1000.0));

        assert!(!same_currency("GBp", "GBP"));
        assert!(same_currency("GBp", "gbx"));
        assert!(same_currency("gbp", "GBP"));

        let usd_base = ExchangeRateSet::fallback();
        let pounds = usd_base.convert(7900.0, "GBp", "USD").unwrap();
        assert!((pounds - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_table() {
        let rates = ExchangeRateSet::fallback();
        assert_eq!(rates.rate("USD"), Some(1.0));
        assert_eq!(rates.rate("GBP"), Some(0.79));
        assert_eq!(rates.convert(1.0, "USD", "ZAR"), Some(18.73));
    }
}
