//! Risk and trend measures over a fund's monthly closes, and watchlist ranking.
//!
//! All percentages here are in percent units (5.0 is 5%), matching how they are shown.

use crate::core::fund::FundMetrics;
use serde::Serialize;
use std::fmt::Display;

const RISK_FREE_ANNUAL_PCT: f64 = 2.0;
const HIGH_VOLATILITY_PCT: f64 = 5.0;
const LOW_VOLATILITY_PCT: f64 = 3.0;

/// Trend classification from the most recent 1, 3 and 6 month moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    Excellent,
    Good,
    Stable,
    Normal,
    Caution,
    Warning,
    Severe,
}

impl WarningLevel {
    /// Ranking bonus for positive trends.
    fn score_bonus(&self) -> f64 {
        match self {
            WarningLevel::Excellent => 3.0,
            WarningLevel::Good => 2.0,
            WarningLevel::Stable => 1.0,
            _ => 0.0,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            WarningLevel::Excellent => "Exceptional growth",
            WarningLevel::Good => "Healthy growth trend",
            WarningLevel::Stable => "Stable positive growth",
            WarningLevel::Normal => "Price stable",
            WarningLevel::Caution => "Minor decline observed",
            WarningLevel::Warning => "Notable decline",
            WarningLevel::Severe => "Significant decline detected",
        }
    }
}

impl Display for WarningLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                WarningLevel::Excellent => "excellent",
                WarningLevel::Good => "good",
                WarningLevel::Stable => "stable",
                WarningLevel::Normal => "normal",
                WarningLevel::Caution => "caution",
                WarningLevel::Warning => "warning",
                WarningLevel::Severe => "severe",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub level: WarningLevel,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskMetrics {
    /// Population standard deviation of monthly changes.
    pub volatility: f64,
    pub mean_monthly_change: f64,
    /// Total change over the series divided by volatility; zero when volatility is zero.
    pub risk_adjusted_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundRanking {
    pub symbol: String,
    pub current_price: f64,
    pub currency: Option<String>,
    pub monthly_change: f64,
    pub risk: RiskMetrics,
    pub assessment: Assessment,
    pub score: f64,
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from <= 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// Month-over-month changes in percent.
pub fn monthly_changes(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| pct_change(w[0], w[1])).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn volatility(closes: &[f64]) -> f64 {
    std_dev(&monthly_changes(closes))
}

/// Largest peak-to-trough fall in percent.
pub fn max_drawdown(closes: &[f64]) -> f64 {
    let Some(first) = closes.first() else {
        return 0.0;
    };
    let mut peak = *first;
    let mut worst: f64 = 0.0;
    for close in closes {
        peak = peak.max(*close);
        if peak > 0.0 {
            worst = worst.max((peak - close) / peak * 100.0);
        }
    }
    worst
}

/// Annualized Sharpe ratio from monthly changes against a 2% annual risk-free rate.
///
/// `None` for fewer than two changes or a flat series.
pub fn sharpe_ratio(closes: &[f64]) -> Option<f64> {
    let changes = monthly_changes(closes);
    let deviation = std_dev(&changes);
    if changes.len() < 2 || deviation == 0.0 {
        return None;
    }
    let excess = mean(&changes) - RISK_FREE_ANNUAL_PCT / 12.0;
    Some(excess / deviation * 12f64.sqrt())
}

pub fn risk_metrics(closes: &[f64]) -> RiskMetrics {
    let changes = monthly_changes(closes);
    let volatility = std_dev(&changes);
    let total_change = match (closes.first(), closes.last()) {
        (Some(first), Some(last)) => pct_change(*first, *last),
        _ => 0.0,
    };
    RiskMetrics {
        volatility,
        mean_monthly_change: mean(&changes),
        risk_adjusted_return: if volatility > 0.0 {
            total_change / volatility
        } else {
            0.0
        },
        max_drawdown: max_drawdown(closes),
        sharpe_ratio: sharpe_ratio(closes),
    }
}

/// Close `months` back from the latest, or the oldest close for short series.
fn close_back(closes: &[f64], months: usize) -> f64 {
    closes[closes.len().saturating_sub(months + 1)]
}

/// Classifies the recent trend. Later checks can escalate or override the monthly verdict.
pub fn assess(closes: &[f64]) -> Assessment {
    let mut details = Vec::new();
    if closes.len() < 2 {
        return Assessment {
            level: WarningLevel::Normal,
            details,
        };
    }

    let latest = close_back(closes, 0);
    let monthly = pct_change(close_back(closes, 1), latest);
    let three_month = pct_change(close_back(closes, 3), latest);
    let six_month = pct_change(close_back(closes, 6), latest);

    let mut level = WarningLevel::Normal;
    if monthly > 5.0 {
        level = WarningLevel::Excellent;
        details.push(format!("Strong monthly growth: +{monthly:.1}%"));
    } else if monthly > 2.0 {
        level = WarningLevel::Good;
        details.push(format!("Healthy monthly growth: +{monthly:.1}%"));
    } else if monthly > 0.0 {
        level = WarningLevel::Stable;
        details.push(format!("Stable monthly growth: +{monthly:.1}%"));
    } else if monthly < -10.0 {
        level = WarningLevel::Severe;
        details.push(format!("Significant monthly decline: {monthly:.1}%"));
    } else if monthly < -5.0 {
        level = WarningLevel::Warning;
        details.push(format!("Notable monthly decline: {monthly:.1}%"));
    } else if monthly < -2.0 {
        level = WarningLevel::Caution;
        details.push(format!("Minor monthly decline: {monthly:.1}%"));
    }

    if three_month > 10.0 {
        if level != WarningLevel::Excellent {
            level = WarningLevel::Excellent;
            details.push(format!("Exceptional 3-month growth: +{three_month:.1}%"));
        }
    } else if three_month < -15.0 {
        level = WarningLevel::Severe;
        details.push(format!("Severe 3-month decline: {three_month:.1}%"));
    } else if three_month < -10.0
        && level != WarningLevel::Severe
        && level != WarningLevel::Excellent
    {
        level = WarningLevel::Warning;
        details.push(format!("Significant 3-month decline: {three_month:.1}%"));
    }

    if six_month > 15.0 {
        if level != WarningLevel::Excellent {
            level = WarningLevel::Excellent;
            details.push(format!("Outstanding 6-month growth: +{six_month:.1}%"));
        }
    } else if six_month < -20.0 {
        level = WarningLevel::Severe;
        details.push(format!("Critical 6-month decline: {six_month:.1}%"));
    }

    let volatility = volatility(closes);
    if volatility > HIGH_VOLATILITY_PCT {
        details.push(format!("High volatility detected: {volatility:.1}%"));
        if level != WarningLevel::Excellent && level != WarningLevel::Severe {
            level = WarningLevel::Warning;
        }
    }

    Assessment { level, details }
}

/// Composite score, higher is better: risk-adjusted return counts double, then the latest
/// monthly move, a low-volatility bonus and a trend bonus.
fn score(risk: &RiskMetrics, monthly_change: f64, level: WarningLevel) -> f64 {
    let low_volatility_bonus = if risk.volatility < LOW_VOLATILITY_PCT {
        2.0
    } else {
        0.0
    };
    risk.risk_adjusted_return * 2.0 + monthly_change + low_volatility_bonus + level.score_bonus()
}

pub fn rank_fund(fund: &FundMetrics) -> FundRanking {
    let closes = &fund.monthly_closes;
    let risk = risk_metrics(closes);
    let monthly_change = monthly_changes(closes).last().copied().unwrap_or(0.0);
    let assessment = assess(closes);
    FundRanking {
        symbol: fund.symbol.clone(),
        current_price: fund.current_price,
        currency: fund.currency.clone(),
        monthly_change,
        score: score(&risk, monthly_change, assessment.level),
        risk,
        assessment,
    }
}

/// Ranks funds best first.
pub fn rank_funds(funds: &[FundMetrics]) -> Vec<FundRanking> {
    let mut rankings: Vec<FundRanking> = funds.iter().map(rank_fund).collect();
    rankings.sort_by(|a, b| b.score.total_cmp(&a.score));
    rankings
}
