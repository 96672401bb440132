use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{instrument, warn};

use super::util::{get_json, http_client};
use crate::core::currency::{ExchangeRateProvider, ExchangeRateSet};

/// Latest rates for a fixed base currency from exchangerate-api.com.
pub struct ExchangeRateApiProvider {
    base_url: String,
    base_currency: String,
    targets: Vec<String>,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(
        base_url: &str,
        base_currency: &str,
        targets: &[String],
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            base_currency: base_currency.to_uppercase(),
            targets: targets.iter().map(|t| t.to_uppercase()).collect(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl ExchangeRateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %self.base_currency))]
    async fn fetch_rates(&self) -> Result<ExchangeRateSet> {
        let url = format!("{}/v4/latest/{}", self.base_url, self.base_currency);
        let subject = format!("base currency: {}", self.base_currency);
        let data: LatestRatesResponse = get_json(&self.client, &url, &subject).await?;

        let mut rates = BTreeMap::new();
        for target in &self.targets {
            match data.rates.get(target) {
                Some(rate) => {
                    rates.insert(target.clone(), *rate);
                }
                None => warn!(currency = %target, "Rate missing from response"),
            }
        }

        if rates.is_empty() {
            return Err(anyhow!(
                "No rate data found for targets {:?} against {}",
                self.targets,
                self.base_currency
            ));
        }

        Ok(ExchangeRateSet {
            base: self.base_currency.clone(),
            rates,
            last_updated: Utc::now(),
        })
    }
}
