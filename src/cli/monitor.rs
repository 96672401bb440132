use super::ui;
use crate::core::analytics::{self, FundRanking, WarningLevel};
use crate::sync::MarketDataSync;
use anyhow::Result;
use comfy_table::{Cell, Color, Table};
use tracing::warn;

/// Ranks the given funds by risk-adjusted performance and flags worrying trends.
///
/// Symbols are resolved one at a time through the cache, so a warm cache costs no requests.
pub async fn run(sync: &MarketDataSync, symbols: &[String]) -> Result<()> {
    if symbols.is_empty() {
        println!("No symbols to monitor. Add some to the watchlist or pass them as arguments.");
        return Ok(());
    }

    let pb = ui::new_progress_bar(symbols.len() as u64, true);
    let mut funds = Vec::with_capacity(symbols.len());
    let mut missing = Vec::new();
    for symbol in symbols {
        pb.set_message(symbol.clone());
        match sync.ensure_fund_data(symbol).await {
            Some(sourced) => funds.push(sourced.data),
            None => {
                warn!(%symbol, "No market data, leaving fund out of the ranking");
                missing.push(symbol.as_str());
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let rankings = analytics::rank_funds(&funds);
    println!("\n{}", ui::style_text("Fund monitor", ui::StyleType::Title));
    println!("{}", render(&rankings));

    for ranking in rankings.iter().filter(|r| !r.assessment.details.is_empty()) {
        println!(
            "{} {}",
            ui::style_text(&format!("{}:", ranking.symbol), ui::StyleType::TotalLabel),
            ranking.assessment.level.message()
        );
        for detail in &ranking.assessment.details {
            println!("  {}", ui::style_text(detail, ui::StyleType::Subtle));
        }
    }

    if !missing.is_empty() {
        println!(
            "{}",
            ui::style_text(
                &format!("No market data for: {}", missing.join(", ")),
                ui::StyleType::Error
            )
        );
    }
    Ok(())
}

fn level_cell(level: WarningLevel) -> Cell {
    let color = match level {
        WarningLevel::Excellent | WarningLevel::Good | WarningLevel::Stable => Color::Green,
        WarningLevel::Normal => Color::White,
        WarningLevel::Caution => Color::Yellow,
        WarningLevel::Warning => Color::DarkYellow,
        WarningLevel::Severe => Color::Red,
    };
    Cell::new(level.to_string()).fg(color)
}

fn render(rankings: &[FundRanking]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Symbol"),
        ui::header_cell("Price"),
        ui::header_cell("1M"),
        ui::header_cell("Volatility"),
        ui::header_cell("Max drawdown"),
        ui::header_cell("Sharpe"),
        ui::header_cell("Trend"),
        ui::header_cell("Score"),
    ]);

    for (index, ranking) in rankings.iter().enumerate() {
        let currency = ranking.currency.as_deref().unwrap_or("");
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&ranking.symbol),
            ui::value_cell(ui::format_amount(ranking.current_price, currency)),
            ui::change_cell(ranking.monthly_change / 100.0),
            ui::value_cell(format!("{:.2}%", ranking.risk.volatility)),
            ui::value_cell(format!("{:.2}%", ranking.risk.max_drawdown)),
            ranking
                .risk
                .sharpe_ratio
                .map_or(ui::na_cell(false), |s| ui::value_cell(format!("{s:.2}"))),
            level_cell(ranking.assessment.level),
            ui::value_cell(format!("{:.1}", ranking.score)),
        ]);
    }
    table
}
