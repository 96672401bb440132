use super::ui;
use crate::sync::{StatusReport, StatusReporter};
use chrono::Utc;
use comfy_table::{Cell, Table};

/// Prints cache status for the watchlist and exchange rates without touching the network.
pub async fn run(reporter: &StatusReporter, watchlist: &[String]) -> anyhow::Result<()> {
    let mut rows = Vec::with_capacity(watchlist.len() + 1);
    for symbol in watchlist {
        rows.push((symbol.clone(), reporter.get_status(symbol).await));
    }
    rows.push((
        "Exchange rates".to_string(),
        reporter.exchange_rate_status().await,
    ));

    println!("\n{}", ui::style_text("Market data status", ui::StyleType::Title));
    println!("{}", render(&rows));

    let last_batch = reporter
        .last_batch_update()
        .await
        .map(|ts| ui::format_age(Utc::now() - ts))
        .unwrap_or_else(|| "never".to_string());
    println!(
        "{}",
        ui::style_text(&format!("Last batch refresh: {last_batch}"), ui::StyleType::Subtle)
    );
    Ok(())
}

fn render(rows: &[(String, Option<StatusReport>)]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Entity"),
        ui::header_cell("Status"),
        ui::header_cell("Last updated"),
        ui::header_cell("Age"),
    ]);

    for (name, report) in rows {
        match report {
            Some(report) => table.add_row(vec![
                Cell::new(name),
                ui::status_cell(report.status),
                Cell::new(report.last_update_time.format("%Y-%m-%d %H:%M UTC").to_string()),
                Cell::new(ui::format_age(report.age)),
            ]),
            None => table.add_row(vec![
                Cell::new(name),
                Cell::new("not cached").fg(comfy_table::Color::DarkGrey),
                ui::na_cell(false),
                ui::na_cell(false),
            ]),
        };
    }
    table
}
