use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_TRADING_DAYS;
use crate::math::{mean, percentile, sample_std, sqrt_decimal};
use crate::series::StrategyReturnSeries;
use crate::types::Rate;
use crate::{PairsTradingError, PairsTradingResult};

/// Performance statistics, in the order they are always reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMetric {
    AnnualReturn,
    CumulativeReturns,
    AnnualVolatility,
    SharpeRatio,
    CalmarRatio,
    Stability,
    MaxDrawdown,
    OmegaRatio,
    SortinoRatio,
    Skew,
    Kurtosis,
    TailRatio,
    DailyValueAtRisk,
}

impl RiskMetric {
    pub const ALL: [RiskMetric; 13] = [
        RiskMetric::AnnualReturn,
        RiskMetric::CumulativeReturns,
        RiskMetric::AnnualVolatility,
        RiskMetric::SharpeRatio,
        RiskMetric::CalmarRatio,
        RiskMetric::Stability,
        RiskMetric::MaxDrawdown,
        RiskMetric::OmegaRatio,
        RiskMetric::SortinoRatio,
        RiskMetric::Skew,
        RiskMetric::Kurtosis,
        RiskMetric::TailRatio,
        RiskMetric::DailyValueAtRisk,
    ];

    /// Position in the reported vector.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskMetric::AnnualReturn => "Annual return",
            RiskMetric::CumulativeReturns => "Cumulative returns",
            RiskMetric::AnnualVolatility => "Annual volatility",
            RiskMetric::SharpeRatio => "Sharpe ratio",
            RiskMetric::CalmarRatio => "Calmar ratio",
            RiskMetric::Stability => "Stability",
            RiskMetric::MaxDrawdown => "Max drawdown",
            RiskMetric::OmegaRatio => "Omega ratio",
            RiskMetric::SortinoRatio => "Sortino ratio",
            RiskMetric::Skew => "Skew",
            RiskMetric::Kurtosis => "Kurtosis",
            RiskMetric::TailRatio => "Tail ratio",
            RiskMetric::DailyValueAtRisk => "Daily value at risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskStatistic {
    pub metric: RiskMetric,
    /// `None` where the statistic is undefined (e.g. Sharpe of a flat series)
    pub value: Option<Decimal>,
}

/// Fixed-order vector of scalar statistics for one return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub observations: usize,
    pub trading_days_per_year: u32,
    pub statistics: Vec<RiskStatistic>,
}

impl RiskSummary {
    pub fn get(&self, metric: RiskMetric) -> Option<Decimal> {
        self.statistics
            .get(metric.index())
            .filter(|s| s.metric == metric)
            .and_then(|s| s.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RiskStatistic> {
        self.statistics.iter()
    }
}

/// Anything able to turn a return series into a `RiskSummary`.
pub trait RiskAnalytics {
    fn summarize(&self, returns: &StrategyReturnSeries) -> PairsTradingResult<RiskSummary>;
}

/// Built-in daily-return statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfStats {
    pub trading_days_per_year: u32,
}

impl Default for PerfStats {
    fn default() -> Self {
        Self {
            trading_days_per_year: DEFAULT_TRADING_DAYS,
        }
    }
}

impl RiskAnalytics for PerfStats {
    fn summarize(&self, returns: &StrategyReturnSeries) -> PairsTradingResult<RiskSummary> {
        risk_summary(returns.values(), self.trading_days_per_year)
    }
}

/// Statistics for a series of periodic simple returns.
pub fn risk_summary(returns: &[Rate], trading_days_per_year: u32) -> PairsTradingResult<RiskSummary> {
    if trading_days_per_year == 0 {
        return Err(PairsTradingError::InvalidInput {
            field: "trading_days_per_year".into(),
            reason: "Must be positive".into(),
        });
    }
    if returns.is_empty() {
        return Err(PairsTradingError::InsufficientHistory {
            required: 1,
            actual: 0,
        });
    }

    let ann = Decimal::from(trading_days_per_year);
    let n = Decimal::from(returns.len() as i64);
    let mean_r = mean(returns).unwrap_or(Decimal::ZERO);
    let std_r = sample_std(returns);

    let growth = returns
        .iter()
        .fold(Decimal::ONE, |acc, r| acc * (Decimal::ONE + r));
    let annual_return = annualise_growth(growth, ann / n);
    let max_dd = max_drawdown(returns);

    let sharpe = std_r
        .filter(|s| !s.is_zero())
        .map(|s| mean_r / s * sqrt_decimal(ann));
    let calmar = match (annual_return, max_dd < Decimal::ZERO) {
        (Some(a), true) => Some(a / max_dd.abs()),
        _ => None,
    };

    let gains: Decimal = returns.iter().filter(|r| **r > Decimal::ZERO).sum();
    let losses: Decimal = -returns.iter().filter(|r| **r < Decimal::ZERO).sum::<Decimal>();
    let omega = if losses > Decimal::ZERO {
        Some(gains / losses)
    } else {
        None
    };

    let downside_sq: Vec<Decimal> = returns
        .iter()
        .map(|r| {
            let d = (*r).min(Decimal::ZERO);
            d * d
        })
        .collect();
    let downside = sqrt_decimal(mean(&downside_sq).unwrap_or(Decimal::ZERO)) * sqrt_decimal(ann);
    let sortino = if downside.is_zero() {
        None
    } else {
        Some(mean_r * ann / downside)
    };

    let (skew, kurtosis) = central_moments(returns, mean_r);

    let tail = match (percentile(returns, dec!(95)), percentile(returns, dec!(5))) {
        (Some(hi), Some(lo)) if !lo.is_zero() => Some(hi.abs() / lo.abs()),
        _ => None,
    };

    let values = [
        annual_return,
        Some(growth - Decimal::ONE),
        std_r.map(|s| s * sqrt_decimal(ann)),
        sharpe,
        calmar,
        stability(returns),
        Some(max_dd),
        omega,
        sortino,
        skew,
        kurtosis,
        tail,
        std_r.map(|s| mean_r - dec!(2) * s),
    ];
    let statistics: Vec<RiskStatistic> = RiskMetric::ALL
        .iter()
        .zip(values)
        .map(|(metric, value)| RiskStatistic {
            metric: *metric,
            value,
        })
        .collect();
    debug!(
        observations = returns.len(),
        undefined = statistics.iter().filter(|s| s.value.is_none()).count(),
        "risk statistics computed"
    );

    Ok(RiskSummary {
        observations: returns.len(),
        trading_days_per_year,
        statistics,
    })
}

/// Largest peak-to-trough fall of compounded wealth, as a non-positive
/// fraction. Starting capital counts as the first peak.
pub fn max_drawdown(returns: &[Rate]) -> Rate {
    let mut wealth = Decimal::ONE;
    let mut peak = Decimal::ONE;
    let mut worst = Decimal::ZERO;
    for r in returns {
        wealth *= Decimal::ONE + r;
        if wealth > peak {
            peak = wealth;
        }
        let dd = wealth / peak - Decimal::ONE;
        if dd < worst {
            worst = dd;
        }
    }
    worst
}

/// growth^(periods_per_year / n) - 1
fn annualise_growth(growth: Decimal, exponent: Decimal) -> Option<Rate> {
    if growth < Decimal::ZERO {
        return None;
    }
    if growth.is_zero() {
        return Some(-Decimal::ONE);
    }
    growth.checked_powd(exponent).map(|g| g - Decimal::ONE)
}

/// R-squared of cumulative log returns against time.
fn stability(returns: &[Rate]) -> Option<Decimal> {
    if returns.len() < 2 {
        return None;
    }
    let mut acc = Decimal::ZERO;
    let mut cum_log = Vec::with_capacity(returns.len());
    for r in returns {
        acc += (Decimal::ONE + r).checked_ln()?;
        cum_log.push(acc);
    }
    let t: Vec<Decimal> = (0..returns.len()).map(|i| Decimal::from(i as i64)).collect();
    let mt = mean(&t)?;
    let my = mean(&cum_log)?;
    let (mut sxy, mut sxx, mut syy) = (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
    for (x, y) in t.iter().zip(cum_log.iter()) {
        sxy += (x - mt) * (y - my);
        sxx += (x - mt) * (x - mt);
        syy += (y - my) * (y - my);
    }
    if syy.is_zero() {
        return Some(Decimal::ZERO);
    }
    Some(sxy * sxy / (sxx * syy))
}

/// Biased sample skewness and excess kurtosis.
fn central_moments(returns: &[Rate], m: Decimal) -> (Option<Decimal>, Option<Decimal>) {
    let n = Decimal::from(returns.len() as i64);
    let (mut m2, mut m3, mut m4) = (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
    for r in returns {
        let d = r - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;
    if m2.is_zero() {
        return (None, None);
    }
    let skew = m3 / (m2 * sqrt_decimal(m2));
    let kurtosis = m4 / (m2 * m2) - dec!(3);
    (Some(skew), Some(kurtosis))
}
