use crate::core::policy::{DataCategory, FreshnessPolicy};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_EXCHANGE_RATE_BASE_URL: &str = "https://api.exchangerate-api.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_target_currencies")]
    pub targets: Vec<String>,
}

fn default_base_currency() -> String {
    "GBP".to_string()
}

fn default_target_currencies() -> Vec<String> {
    vec!["USD".to_string(), "ZAR".to_string()]
}

impl Default for ExchangeRateProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EXCHANGE_RATE_BASE_URL.to_string(),
            base_currency: default_base_currency(),
            targets: default_target_currencies(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub exchange_rates: Option<ExchangeRateProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            }),
            exchange_rates: Some(ExchangeRateProviderConfig::default()),
        }
    }
}

impl ProvidersConfig {
    pub fn yahoo_base_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_BASE_URL, |p| &p.base_url)
    }

    pub fn exchange_rates(&self) -> ExchangeRateProviderConfig {
        self.exchange_rates.clone().unwrap_or_default()
    }
}

/// Pacing and freshness knobs for the market data layer.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Per-category overrides, in hours.
    #[serde(default)]
    pub ttl_hours: HashMap<DataCategory, u64>,
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            ttl_hours: HashMap::new(),
        }
    }
}

impl SyncConfig {
    pub fn freshness_policy(&self) -> Result<FreshnessPolicy> {
        let overrides: HashMap<DataCategory, chrono::TimeDelta> = self
            .ttl_hours
            .iter()
            .map(|(category, hours)| {
                let ttl = i64::try_from(*hours)
                    .ok()
                    .and_then(chrono::TimeDelta::try_hours)
                    .with_context(|| {
                        format!("ttl_hours for `{category}` is out of range: {hours}")
                    })?;
                Ok((*category, ttl))
            })
            .collect::<Result<_>>()?;
        Ok(FreshnessPolicy::with_overrides(&overrides))
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Defaults for the `project` command.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProjectionDefaults {
    #[serde(default = "default_initial")]
    pub initial_investment: f64,
    #[serde(default = "default_monthly")]
    pub monthly_contribution: f64,
    #[serde(default = "default_years")]
    pub years: u32,
    #[serde(default = "default_annual_return")]
    pub annual_return_rate: f64,
    #[serde(default = "default_expense_ratio")]
    pub expense_ratio: f64,
}

fn default_initial() -> f64 {
    800.0
}

fn default_monthly() -> f64 {
    80.0
}

fn default_years() -> u32 {
    10
}

fn default_annual_return() -> f64 {
    0.08
}

fn default_expense_ratio() -> f64 {
    0.0015
}

impl Default for ProjectionDefaults {
    fn default() -> Self {
        Self {
            initial_investment: default_initial(),
            monthly_contribution: default_monthly(),
            years: default_years(),
            annual_return_rate: default_annual_return(),
            expense_ratio: default_expense_ratio(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub watchlist: Vec<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub projection: ProjectionDefaults,
    pub currency: String,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fundsync", "fundsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "fundsync", "fundsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
