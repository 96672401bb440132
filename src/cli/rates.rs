use super::ui;
use crate::core::currency::ExchangeRateSet;
use crate::sync::{DataSource, MarketDataSync};
use comfy_table::{Cell, Table};

pub async fn run(sync: &MarketDataSync) -> anyhow::Result<()> {
    let (rates, source) = match sync.ensure_exchange_rates().await {
        Some(sourced) => (sourced.data, Some(sourced.source)),
        None => (ExchangeRateSet::fallback(), None),
    };

    println!(
        "\nExchange rates: {}",
        ui::style_text(&format!("1 {}", rates.base), ui::StyleType::Title)
    );
    println!("{}", render(&rates));
    match source {
        Some(source) => println!(
            "{}",
            ui::style_text(&format!("Source: {}", source_label(source)), ui::StyleType::Subtle)
        ),
        None => println!(
            "{}",
            ui::style_text(
                "Live rates unavailable, showing built-in reference rates",
                ui::StyleType::Error
            )
        ),
    }
    Ok(())
}

fn source_label(source: DataSource) -> &'static str {
    match source {
        DataSource::Cache => "cache",
        DataSource::Api => "live",
        DataSource::ExpiredCache => "expired cache",
    }
}

fn render(rates: &ExchangeRateSet) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);
    for (currency, rate) in &rates.rates {
        table.add_row(vec![Cell::new(currency), ui::value_cell(format!("{rate:.4}"))]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_each_rate() {
        let output = render(&ExchangeRateSet::fallback()).to_string();
        assert!(output.contains("GBP"));
        assert!(output.contains("0.7900"));
        assert!(output.contains("18.7300"));
    }
}
