use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::signals::{generate_signals, lag_positions, resolve_positions, Position, Signal};
use crate::config::SignalThresholds;
use crate::series::{PricePair, Series, StrategyReturnSeries, ZScoreSeries};
use crate::types::{InstrumentPair, Rate};
use crate::{PairsTradingError, PairsTradingResult};

/// One row of the backtest trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestPeriod {
    pub date: NaiveDate,
    pub zscore: Option<Decimal>,
    pub signal: Signal,
    /// Position decided at the close of this period
    pub position: Position,
    /// Position carried through this period (previous period's decision)
    pub lagged_position: Option<Position>,
    pub first_return: Option<Rate>,
    pub second_return: Option<Rate>,
    /// First instrument's simple return minus the second's
    pub differential_return: Option<Rate>,
    pub strategy_return: Rate,
    pub cumulative_return: Decimal,
}

/// Output of a full backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub instruments: InstrumentPair,
    pub thresholds: SignalThresholds,
    pub periods: Vec<BacktestPeriod>,
    pub returns: StrategyReturnSeries,
    /// Growth of one unit: running product of (1 + strategy return)
    pub cumulative_returns: Series<Decimal>,
    pub final_position: Position,
    /// Number of times the resolved position changed
    pub position_changes: usize,
    /// Periods with a non-flat carried position
    pub periods_in_market: usize,
    pub total_return: Rate,
}

/// Strategy returns for a pair given its z-scores.
pub fn backtest(
    prices: &PricePair,
    zscores: &ZScoreSeries,
    thresholds: &SignalThresholds,
) -> PairsTradingResult<StrategyReturnSeries> {
    run_backtest(prices, zscores, thresholds).map(|report| report.returns)
}

/// Signals, resolved positions, one-period execution lag and per-period
/// returns.
pub fn run_backtest(
    prices: &PricePair,
    zscores: &ZScoreSeries,
    thresholds: &SignalThresholds,
) -> PairsTradingResult<BacktestReport> {
    thresholds.validate()?;
    let dates = prices.dates();
    if dates.as_slice() != zscores.dates() {
        return Err(PairsTradingError::Alignment(format!(
            "prices cover {} dates and z-scores {}, or their dates differ",
            dates.len(),
            zscores.len()
        )));
    }

    let signals = generate_signals(zscores, thresholds);
    let positions = resolve_positions(&signals);
    let lagged = lag_positions(&positions);

    let first_returns = prices.first().simple_returns();
    let second_returns = prices.second().simple_returns();

    let mut periods = Vec::with_capacity(dates.len());
    let mut strategy_returns = Vec::with_capacity(dates.len());
    let mut cumulative = Decimal::ONE;
    let mut cumulative_series = Vec::with_capacity(dates.len());

    for (i, date) in dates.iter().enumerate() {
        let differential = match (first_returns[i], second_returns[i]) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };
        let carried = lagged.values()[i];
        let strategy_return = match (carried, differential) {
            (Some(p), Some(d)) => Decimal::from(p) * d,
            _ => Decimal::ZERO,
        };
        cumulative *= Decimal::ONE + strategy_return;

        strategy_returns.push(strategy_return);
        cumulative_series.push(cumulative);
        periods.push(BacktestPeriod {
            date: *date,
            zscore: zscores.values()[i],
            signal: signals.values()[i],
            position: positions.values()[i],
            lagged_position: carried,
            first_return: first_returns[i],
            second_return: second_returns[i],
            differential_return: differential,
            strategy_return,
            cumulative_return: cumulative,
        });
    }

    let position_changes = positions
        .values()
        .windows(2)
        .filter(|w| w[0] != w[1])
        .count();
    let periods_in_market = lagged
        .values()
        .iter()
        .filter(|p| matches!(p, Some(Position::Long | Position::Short)))
        .count();
    let final_position = positions.values().last().copied().unwrap_or_default();
    debug!(position_changes, periods_in_market, ?final_position, "positions resolved");

    let total_return = cumulative - Decimal::ONE;
    info!(periods = periods.len(), %total_return, "backtest complete");

    Ok(BacktestReport {
        instruments: prices.instruments(),
        thresholds: *thresholds,
        periods,
        returns: Series::new(dates.clone(), strategy_returns)?,
        cumulative_returns: Series::new(dates, cumulative_series)?,
        final_position,
        position_changes,
        periods_in_market,
        total_return,
    })
}

/// Running product of (1 + r).
pub fn cumulative_returns(returns: &[Rate]) -> Vec<Decimal> {
    let mut acc = Decimal::ONE;
    returns
        .iter()
        .map(|r| {
            acc *= Decimal::ONE + r;
            acc
        })
        .collect()
}
