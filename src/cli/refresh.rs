use super::ui;
use crate::sync::{BatchOutcome, BatchReport, DataSource, MarketDataSync, StatusReporter};
use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

/// Runs a batch sweep over the watchlist and prints what each symbol resolved to.
pub async fn run(sync: &MarketDataSync, watchlist: &[String], force: bool) -> Result<()> {
    if watchlist.is_empty() {
        println!("No symbols in the watchlist to refresh.");
        return Ok(());
    }

    let pb = ui::new_progress_bar(watchlist.len() as u64, true);
    pb.set_message("Refreshing market data");
    let outcome = sync
        .batch_refresh_with(watchlist, force, &|symbol, _| {
            pb.set_message(symbol.to_string());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    match outcome {
        BatchOutcome::Skipped { last_run } => {
            let since = last_run
                .map(|ts| ui::format_age(Utc::now() - ts))
                .unwrap_or_else(|| "never".to_string());
            println!(
                "{} Last batch refresh ran {}. Use --force to refresh anyway.",
                ui::style_text("Skipped:", ui::StyleType::Subtle),
                since
            );
        }
        BatchOutcome::Completed(report) => {
            let table = render_report(&report, &sync.status_reporter()).await;
            println!(
                "\n{}",
                ui::style_text("Batch refresh", ui::StyleType::Title)
            );
            println!("{table}");
            if !report.failed.is_empty() {
                println!(
                    "{}",
                    ui::style_text(
                        &format!("{} symbol(s) failed with no cached data", report.failed.len()),
                        ui::StyleType::Error
                    )
                );
            }
        }
    }
    Ok(())
}

async fn render_report(report: &BatchReport, reporter: &StatusReporter) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Source"),
        ui::header_cell("Status"),
        ui::header_cell("Updated"),
    ]);

    let rows = report
        .from_api
        .iter()
        .map(|s| (s, Some(DataSource::Api)))
        .chain(report.from_cache.iter().map(|s| (s, Some(DataSource::Cache))))
        .chain(
            report
                .from_expired_cache
                .iter()
                .map(|s| (s, Some(DataSource::ExpiredCache))),
        )
        .chain(report.failed.iter().map(|s| (s, None)));

    for (symbol, source) in rows {
        let status = reporter.get_status(symbol).await;
        table.add_row(vec![
            Cell::new(symbol),
            ui::source_cell(source),
            status.as_ref().map_or(ui::na_cell(true), |s| ui::status_cell(s.status)),
            status
                .as_ref()
                .map_or(ui::na_cell(true), |s| Cell::new(ui::format_age(s.age))),
        ]);
    }
    table
}
