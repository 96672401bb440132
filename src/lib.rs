pub mod cli;
pub mod core;
pub mod providers;
pub mod store;
pub mod sync;

pub use crate::core::config;

use crate::cli::project::ProjectArgs;
use crate::config::AppConfig;
use crate::providers::exchange_rate_api::ExchangeRateApiProvider;
use crate::providers::yahoo_finance::YahooFundProvider;
use crate::sync::MarketDataSync;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Refresh { force: bool },
    Fund { symbol: String },
    Rates,
    Status,
    /// Empty `symbols` means the configured watchlist.
    Monitor { symbols: Vec<String> },
    Project(ProjectArgs),
}

/// Wires the store, both fetchers and the orchestrator from config.
pub fn build_sync(config: &AppConfig) -> Result<MarketDataSync> {
    let store = store::open_store(config);
    let timeout = config.sync.fetch_timeout();

    let funds = YahooFundProvider::new(config.providers.yahoo_base_url(), timeout)?;
    let rates_config = config.providers.exchange_rates();
    let rates = ExchangeRateApiProvider::new(
        &rates_config.base_url,
        &rates_config.base_currency,
        &rates_config.targets,
        timeout,
    )?;

    MarketDataSync::from_config(&config.sync, store, Arc::new(funds), Arc::new(rates))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fundsync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let sync = build_sync(&config)?;

    match command {
        AppCommand::Refresh { force } => cli::refresh::run(&sync, &config.watchlist, force).await,
        AppCommand::Fund { symbol } => cli::fund::run(&sync, &symbol, &config.currency).await,
        AppCommand::Rates => cli::rates::run(&sync).await,
        AppCommand::Status => cli::status::run(&sync.status_reporter(), &config.watchlist).await,
        AppCommand::Monitor { symbols } => {
            let symbols = if symbols.is_empty() {
                &config.watchlist
            } else {
                &symbols
            };
            cli::monitor::run(&sync, symbols).await
        }
        AppCommand::Project(args) => {
            cli::project::run(&sync, &args, &config.projection, &config.currency).await
        }
    }
}
