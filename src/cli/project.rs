use super::ui;
use crate::core::config::ProjectionDefaults;
use crate::core::fund::FundMetrics;
use crate::core::projection::{self, MAX_YEARS, MarketFactors, ProjectionInput, ProjectionResult, Scenario};
use crate::sync::MarketDataSync;
use anyhow::{Result, bail};
use comfy_table::{Cell, Table};
use tracing::warn;

/// Inputs for a projection; unset values come from config or the selected fund.
#[derive(Debug, Clone, Default)]
pub struct ProjectArgs {
    pub symbol: Option<String>,
    pub initial_investment: Option<f64>,
    pub monthly_contribution: Option<f64>,
    pub years: Option<u32>,
    pub annual_return_rate: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
}

/// Where the annual return used for a projection came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RateSource {
    Explicit,
    Fund(String),
    Default,
}

pub fn resolve_input(
    args: &ProjectArgs,
    defaults: &ProjectionDefaults,
    fund: Option<&FundMetrics>,
) -> Result<(ProjectionInput, RateSource)> {
    let (annual_return_rate, rate_source) = match (args.annual_return_rate, fund) {
        (Some(rate), _) => (rate, RateSource::Explicit),
        (None, Some(fund)) => match fund.historical_returns.annualized_longest() {
            Some((period, rate)) => (rate, RateSource::Fund(format!("{} {period}", fund.symbol))),
            None => (defaults.annual_return_rate, RateSource::Default),
        },
        (None, None) => (defaults.annual_return_rate, RateSource::Default),
    };

    let input = ProjectionInput {
        initial_investment: args.initial_investment.unwrap_or(defaults.initial_investment),
        monthly_contribution: args
            .monthly_contribution
            .unwrap_or(defaults.monthly_contribution),
        annual_return_rate,
        years: args.years.unwrap_or(defaults.years),
        expense_ratio: args.expense_ratio.unwrap_or(defaults.expense_ratio),
        dividend_yield: args
            .dividend_yield
            .or(fund.map(|f| f.dividend_yield))
            .unwrap_or(0.0),
    };

    if input.initial_investment < 0.0 || input.monthly_contribution < 0.0 {
        bail!("Investment amounts must not be negative");
    }
    if input.years == 0 {
        bail!("Projection needs at least one year");
    }
    if input.years > MAX_YEARS {
        bail!("Projection horizon is limited to {MAX_YEARS} years");
    }
    Ok((input, rate_source))
}

pub async fn run(
    sync: &MarketDataSync,
    args: &ProjectArgs,
    defaults: &ProjectionDefaults,
    currency: &str,
) -> Result<()> {
    let fund = match &args.symbol {
        Some(symbol) => {
            let fetched = sync.ensure_fund_data(symbol).await;
            if fetched.is_none() {
                warn!(%symbol, "No market data for fund, using default return");
            }
            fetched.map(|f| f.data)
        }
        None => None,
    };

    let (input, rate_source) = resolve_input(args, defaults, fund.as_ref())?;
    let factors = MarketFactors::default();
    let results = projection::project_scenarios(&input, &factors);

    let rate_note = match &rate_source {
        RateSource::Explicit => "given".to_string(),
        RateSource::Fund(from) => format!("annualized from {from}"),
        RateSource::Default => "default".to_string(),
    };
    println!(
        "\n{}",
        ui::style_text(
            &format!(
                "Projection over {} years at {:.2}% ({rate_note})",
                input.years,
                input.annual_return_rate * 100.0
            ),
            ui::StyleType::Title
        )
    );
    println!("{}", render(&results, currency));
    println!(
        "{} {}",
        ui::style_text("Total contributions:", ui::StyleType::TotalLabel),
        ui::style_text(
            &ui::format_amount(projection::total_contributions(&input), currency),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}

fn render(results: &[(Scenario, ProjectionResult)], currency: &str) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Scenario"),
        ui::header_cell("Future value"),
        ui::header_cell("With dividends"),
        ui::header_cell("Costs"),
        ui::header_cell("Yearly dividends"),
    ]);
    for (scenario, result) in results {
        table.add_row(vec![
            Cell::new(scenario.label()),
            ui::value_cell(ui::format_amount(result.future_value, currency)),
            ui::value_cell(ui::format_amount(result.future_value_with_dividends, currency)),
            ui::value_cell(ui::format_amount(result.expense_impact, currency)),
            ui::value_cell(ui::format_amount(result.yearly_dividends, currency)),
        ]);
    }
    table
}
