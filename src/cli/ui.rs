use crate::core::cache::EntryStatus;
use crate::core::currency::is_pence;
use crate::sync::DataSource;
use chrono::Duration;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right aligned plain value.
pub fn value_cell(text: impl Into<String>) -> Cell {
    Cell::new(text.into()).set_alignment(CellAlignment::Right)
}

/// Creates a cell for a fractional return, shown as a colored percentage.
pub fn change_cell(change: f64) -> Cell {
    let text = format!("{:.2}%", change * 100.0);
    let color = if change >= 0.0 { Color::Green } else { Color::Red };
    Cell::new(text).fg(color).set_alignment(CellAlignment::Right)
}

/// Creates a cell for "N/A" values, with error-specific styling.
pub fn na_cell(has_error: bool) -> Cell {
    let color = if has_error {
        Color::Red
    } else {
        Color::DarkGrey
    };
    Cell::new("N/A").fg(color).set_alignment(CellAlignment::Right)
}

pub fn status_cell(status: EntryStatus) -> Cell {
    let color = match status {
        EntryStatus::Success => Color::Green,
        EntryStatus::Error => Color::Red,
        EntryStatus::InProgress => Color::Cyan,
        EntryStatus::StaleFallback => Color::Yellow,
    };
    Cell::new(status.to_string()).fg(color)
}

pub fn source_cell(source: Option<DataSource>) -> Cell {
    match source {
        Some(DataSource::Cache) => Cell::new("cache").fg(Color::Green),
        Some(DataSource::Api) => Cell::new("api").fg(Color::Cyan),
        Some(DataSource::ExpiredCache) => Cell::new("expired cache").fg(Color::Yellow),
        None => Cell::new("failed").fg(Color::Red),
    }
}

/// Human readable age such as "3h 12m ago".
pub fn format_age(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    let days = age.num_days();
    let hours = age.num_hours() % 24;
    if days > 0 {
        format!("{days}d {hours}h ago")
    } else if age.num_hours() > 0 {
        format!("{}h {}m ago", age.num_hours(), minutes % 60)
    } else {
        format!("{minutes}m ago")
    }
}

/// Formats an amount with the currency symbol when known.
pub fn format_amount(value: f64, currency: &str) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    if is_pence(currency) {
        return format!("{sign}{}p", group_thousands(value.abs()));
    }
    let symbol = match currency.to_uppercase().as_str() {
        "USD" => "$",
        "GBP" => "£",
        "ZAR" => "R",
        "EUR" => "€",
        _ => "",
    };
    let grouped = group_thousands(value.abs());
    if symbol.is_empty() {
        format!("{sign}{grouped} {}", currency.to_uppercase())
    } else {
        format!("{sign}{symbol}{grouped}")
    }
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (whole, fraction) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{grouped}.{fraction}")
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64, with_message: bool) -> ProgressBar {
    let template = if with_message {
        "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    } else {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    };

    let pb = ProgressBar::new(len);
    if let Ok(progress_style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(progress_style.progress_chars("#>-"));
    }
    pb
}
