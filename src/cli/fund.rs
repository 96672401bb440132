use super::ui;
use crate::core::currency::{ExchangeRateSet, same_currency};
use crate::core::fund::{FundMetrics, ReturnPeriod};
use crate::sync::{MarketDataSync, Sourced};
use anyhow::{Result, bail};
use chrono::Utc;
use comfy_table::{Cell, Table};

/// Shows cached or freshly fetched metrics for one fund.
pub async fn run(sync: &MarketDataSync, symbol: &str, target_currency: &str) -> Result<()> {
    let Some(fund) = sync.ensure_fund_data(symbol).await else {
        let status = sync.status_reporter().get_status(symbol).await;
        let detail = status
            .map(|s| format!(" (status: {}, {})", s.status, ui::format_age(s.age)))
            .unwrap_or_default();
        bail!("No market data available for {symbol}{detail}");
    };

    let rates = sync.exchange_rates_or_fallback().await;
    println!(
        "\nFund: {}",
        ui::style_text(&fund.data.symbol, ui::StyleType::Title)
    );
    println!("{}", render(&fund, &rates, target_currency));
    Ok(())
}

fn render(fund: &Sourced<FundMetrics>, rates: &ExchangeRateSet, target_currency: &str) -> Table {
    let metrics = &fund.data;
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);

    let fund_currency = metrics.currency.as_deref().unwrap_or(target_currency);
    table.add_row(vec![
        Cell::new("Price"),
        ui::value_cell(ui::format_amount(metrics.current_price, fund_currency)),
    ]);
    if !same_currency(fund_currency, target_currency) {
        let converted = rates.convert(metrics.current_price, fund_currency, target_currency);
        table.add_row(vec![
            Cell::new(format!("Price ({})", target_currency.to_uppercase())),
            converted.map_or(ui::na_cell(false), |v| {
                ui::value_cell(ui::format_amount(v, target_currency))
            }),
        ]);
    }

    for period in ReturnPeriod::ALL {
        let value = metrics.historical_returns.get(period);
        let cell = if value == 0.0 {
            ui::na_cell(false)
        } else {
            ui::change_cell(value)
        };
        table.add_row(vec![Cell::new(format!("{period} return")), cell]);
    }

    table.add_row(vec![
        Cell::new("Dividend yield"),
        ui::value_cell(format!("{:.2}%", metrics.dividend_yield * 100.0)),
    ]);
    table.add_row(vec![Cell::new("Source"), ui::source_cell(Some(fund.source))]);
    table.add_row(vec![
        Cell::new("Fetched"),
        Cell::new(ui::format_age(Utc::now() - metrics.last_updated)),
    ]);
    table
}
