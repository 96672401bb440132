use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{get_json, http_client};
use crate::core::fund::{FundDataProvider, FundMetrics, HistoricalReturns, ReturnPeriod};

/// Cumulative return from the close `periods` months back to the latest close.
///
/// `closes` keeps one slot per month so a gap never shifts the comparison month. Reports
/// zero when the series is too short or the earlier slot is empty or unusable, so one
/// missing period never fails the whole fetch.
pub fn trailing_return(closes: &[Option<f64>], periods: usize) -> f64 {
    let Some((latest_index, latest)) = closes
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, c)| c.map(|v| (i, v)))
    else {
        return 0.0;
    };
    let Some(prior) = latest_index
        .checked_sub(periods)
        .and_then(|i| closes[i])
    else {
        return 0.0;
    };
    if prior <= 0.0 {
        return 0.0;
    }
    (latest - prior) / prior
}

fn historical_returns(closes: &[Option<f64>]) -> HistoricalReturns {
    let mut returns = HistoricalReturns::default();
    for period in ReturnPeriod::ALL {
        returns.set(period, trailing_return(closes, period.months()));
    }
    returns
}

/// Monthly price history from the Yahoo Finance chart API.
pub struct YahooFundProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFundProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(YahooFundProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: Option<ChartMeta>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    currency: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[async_trait]
impl FundDataProvider for YahooFundProvider {
    #[instrument(
        name = "YahooFundFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_fund(&self, symbol: &str) -> Result<FundMetrics> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=5y&interval=1mo",
            self.base_url, symbol
        );
        let data: YahooChartResponse = get_json(&self.client, &url, &format!("symbol: {symbol}")).await?;

        let item = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let slots: Vec<Option<f64>> = item
            .indicators
            .and_then(|inds| inds.quote.into_iter().next())
            .and_then(|q| q.close)
            .unwrap_or_default();
        let monthly_closes: Vec<f64> = slots.iter().flatten().copied().collect();

        let current_price = *monthly_closes
            .last()
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;
        debug!(
            months = slots.len(),
            closes = monthly_closes.len(),
            current_price,
            "Parsed monthly closes"
        );

        Ok(FundMetrics {
            symbol: symbol.to_string(),
            current_price,
            currency: item.meta.and_then(|m| m.currency),
            dividend_yield: 0.0,
            historical_returns: historical_returns(&slots),
            monthly_closes,
            last_updated: Utc::now(),
        })
    }
}
