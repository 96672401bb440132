//! Contribution growth projections

use serde::{Deserialize, Serialize};

/// Market-wide assumptions applied on top of the fund's own expense ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketFactors {
    pub inflation: f64,
    pub platform_fee: f64,
    pub trading_costs: f64,
}

impl Default for MarketFactors {
    fn default() -> Self {
        Self {
            inflation: 0.024,
            platform_fee: 0.0025,
            trading_costs: 0.001,
        }
    }
}

/// Longest horizon a projection accepts.
pub const MAX_YEARS: u32 = 100;

const DIVIDEND_GROWTH_RATE: f64 = 0.02;
const SCENARIO_SPREAD: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInput {
    pub initial_investment: f64,
    pub monthly_contribution: f64,
    pub annual_return_rate: f64,
    pub years: u32,
    pub expense_ratio: f64,
    pub dividend_yield: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionResult {
    pub future_value: f64,
    pub future_value_with_dividends: f64,
    pub total_contributions: f64,
    pub expense_impact: f64,
    pub yearly_dividends: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Conservative,
    Expected,
    Optimistic,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Conservative, Scenario::Expected, Scenario::Optimistic];

    pub fn adjust(&self, annual_return_rate: f64) -> f64 {
        match self {
            Scenario::Conservative => annual_return_rate - SCENARIO_SPREAD,
            Scenario::Expected => annual_return_rate,
            Scenario::Optimistic => annual_return_rate + SCENARIO_SPREAD,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Conservative => "Conservative",
            Scenario::Expected => "Expected",
            Scenario::Optimistic => "Optimistic",
        }
    }
}

/// Horizons past `MAX_YEARS` are capped.
fn months(years: u32) -> u32 {
    years.min(MAX_YEARS) * 12
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn total_costs(factors: &MarketFactors, expense_ratio: f64) -> f64 {
    expense_ratio + factors.platform_fee + factors.trading_costs
}

fn monthly_rate(factors: &MarketFactors, annual_return_rate: f64, expense_ratio: f64) -> f64 {
    ((annual_return_rate - factors.inflation) - total_costs(factors, expense_ratio)) / 12.0
}

pub fn future_value(input: &ProjectionInput, factors: &MarketFactors) -> f64 {
    let rate = monthly_rate(factors, input.annual_return_rate, input.expense_ratio);
    let contribution_growth = 1.0 + factors.inflation / 12.0;

    let mut contribution = input.monthly_contribution;
    let mut value = input.initial_investment;
    for _ in 0..months(input.years) {
        value = value * (1.0 + rate) + contribution;
        contribution *= contribution_growth;
    }
    round_cents(value)
}

pub fn future_value_with_dividends(input: &ProjectionInput, factors: &MarketFactors) -> f64 {
    let rate = monthly_rate(factors, input.annual_return_rate, input.expense_ratio);
    let contribution_growth = 1.0 + factors.inflation / 12.0;
    let dividend_growth = DIVIDEND_GROWTH_RATE / 12.0;

    let mut dividend_rate = input.dividend_yield / 12.0;
    let mut contribution = input.monthly_contribution;
    let mut value = input.initial_investment;
    for _ in 0..months(input.years) {
        value *= 1.0 + rate;
        value *= 1.0 + dividend_rate;
        dividend_rate *= 1.0 + dividend_growth;
        value += contribution;
        contribution *= contribution_growth;
    }
    round_cents(value)
}

pub fn total_contributions(input: &ProjectionInput) -> f64 {
    round_cents(input.initial_investment + input.monthly_contribution * 12.0 * input.years as f64)
}

pub fn expense_impact(value: f64, expense_ratio: f64, years: u32, factors: &MarketFactors) -> f64 {
    round_cents(value * total_costs(factors, expense_ratio) * years as f64)
}

pub fn yearly_dividends(value: f64, dividend_yield: f64) -> f64 {
    round_cents(value * dividend_yield)
}

pub fn project(input: &ProjectionInput, factors: &MarketFactors) -> ProjectionResult {
    let future_value = future_value(input, factors);
    let future_value_with_dividends = future_value_with_dividends(input, factors);
    ProjectionResult {
        future_value,
        future_value_with_dividends,
        total_contributions: total_contributions(input),
        expense_impact: expense_impact(
            future_value_with_dividends,
            input.expense_ratio,
            input.years,
            factors,
        ),
        yearly_dividends: yearly_dividends(future_value_with_dividends, input.dividend_yield),
    }
}

pub fn project_scenarios(
    input: &ProjectionInput,
    factors: &MarketFactors,
) -> Vec<(Scenario, ProjectionResult)> {
    Scenario::ALL
        .iter()
        .map(|scenario| {
            let adjusted = ProjectionInput {
                annual_return_rate: scenario.adjust(input.annual_return_rate),
                ..*input
            };
            (*scenario, project(&adjusted, factors))
        })
        .collect()
}
