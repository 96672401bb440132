//! Terminal commands built on the market data layer

pub mod fund;
pub mod monitor;
pub mod project;
pub mod rates;
pub mod refresh;
pub mod setup;
pub mod status;
pub mod ui;
