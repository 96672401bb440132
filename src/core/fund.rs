//! Fund metrics and the fetcher abstraction for price history

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ReturnPeriod {
    OneYear,
    ThreeYears,
    FiveYears,
    TenYears,
}

impl ReturnPeriod {
    pub const ALL: [ReturnPeriod; 4] = [
        ReturnPeriod::OneYear,
        ReturnPeriod::ThreeYears,
        ReturnPeriod::FiveYears,
        ReturnPeriod::TenYears,
    ];

    /// Number of monthly closes between the latest close and the comparison close.
    pub fn months(&self) -> usize {
        self.years() as usize * 12
    }

    pub fn years(&self) -> u32 {
        match self {
            ReturnPeriod::OneYear => 1,
            ReturnPeriod::ThreeYears => 3,
            ReturnPeriod::FiveYears => 5,
            ReturnPeriod::TenYears => 10,
        }
    }
}

impl Display for ReturnPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Y", self.years())
    }
}

impl FromStr for ReturnPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1Y" => Ok(ReturnPeriod::OneYear),
            "3Y" => Ok(ReturnPeriod::ThreeYears),
            "5Y" => Ok(ReturnPeriod::FiveYears),
            "10Y" => Ok(ReturnPeriod::TenYears),
            _ => Err(anyhow::anyhow!("Invalid return period: {}", s)),
        }
    }
}

/// Trailing cumulative returns as fractions (0.1 is 10%).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReturns {
    pub one_year: f64,
    pub three_year: f64,
    pub five_year: f64,
    pub ten_year: f64,
}

impl HistoricalReturns {
    pub fn get(&self, period: ReturnPeriod) -> f64 {
        match period {
            ReturnPeriod::OneYear => self.one_year,
            ReturnPeriod::ThreeYears => self.three_year,
            ReturnPeriod::FiveYears => self.five_year,
            ReturnPeriod::TenYears => self.ten_year,
        }
    }

    pub fn set(&mut self, period: ReturnPeriod, value: f64) {
        match period {
            ReturnPeriod::OneYear => self.one_year = value,
            ReturnPeriod::ThreeYears => self.three_year = value,
            ReturnPeriod::FiveYears => self.five_year = value,
            ReturnPeriod::TenYears => self.ten_year = value,
        }
    }

    /// Longest period with a non-zero return, annualized.
    pub fn annualized_longest(&self) -> Option<(ReturnPeriod, f64)> {
        ReturnPeriod::ALL
            .iter()
            .rev()
            .map(|p| (*p, self.get(*p)))
            .find(|(_, r)| *r != 0.0 && *r > -1.0)
            .map(|(p, r)| (p, (1.0 + r).powf(1.0 / p.years() as f64) - 1.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundMetrics {
    pub symbol: String,
    pub current_price: f64,
    pub currency: Option<String>,
    /// Not available from the price feed; always zero for now.
    pub dividend_yield: f64,
    pub historical_returns: HistoricalReturns,
    /// Monthly closes, oldest first. Months without a close are left out.
    #[serde(default)]
    pub monthly_closes: Vec<f64>,
    pub last_updated: DateTime<Utc>,
}

#[async_trait]
pub trait FundDataProvider: Send + Sync {
    async fn fetch_fund(&self, symbol: &str) -> Result<FundMetrics>;
}
