use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::backtester::cumulative_returns;
use crate::math::{mean, sample_std, sqrt_decimal};
use crate::series::{Series, StrategyReturnSeries};
use crate::types::Rate;
use crate::{PairsTradingError, PairsTradingResult};

/// How many drawdown periods the chart data keeps.
pub const TOP_DRAWDOWNS: usize = 10;

/// One peak-to-recovery episode of the underwater curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPeriod {
    pub peak: NaiveDate,
    pub valley: NaiveDate,
    /// `None` while still under water at the end of the sample
    pub recovery: Option<NaiveDate>,
    /// Fall from peak to valley, non-positive
    pub depth: Rate,
    /// Observations from peak to recovery
    pub duration: Option<usize>,
}

/// Series behind the cumulative-returns, rolling-Sharpe and drawdown charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub cumulative_returns: Series<Decimal>,
    pub rolling_sharpe: Series<Option<Decimal>>,
    pub underwater: Series<Rate>,
    pub drawdown_periods: Vec<DrawdownPeriod>,
}

pub fn chart_data(
    returns: &StrategyReturnSeries,
    rolling_window: usize,
    trading_days_per_year: u32,
) -> PairsTradingResult<ChartData> {
    if rolling_window < 2 {
        return Err(PairsTradingError::InvalidInput {
            field: "rolling_sharpe_window".into(),
            reason: "Rolling window must be at least 2".into(),
        });
    }
    let underwater = underwater(returns);
    let drawdown_periods = top_drawdowns(&underwater, TOP_DRAWDOWNS);
    Ok(ChartData {
        cumulative_returns: returns.with_values(cumulative_returns(returns.values())),
        rolling_sharpe: rolling_sharpe(returns, rolling_window, trading_days_per_year),
        underwater,
        drawdown_periods,
    })
}

/// Fractional distance of compounded wealth below its running maximum.
/// Starting capital counts as the first peak, as in [`max_drawdown`].
///
/// [`max_drawdown`]: super::perf_stats::max_drawdown
pub fn underwater(returns: &StrategyReturnSeries) -> Series<Rate> {
    let mut peak = Decimal::ONE;
    let values = cumulative_returns(returns.values())
        .into_iter()
        .map(|wealth| {
            peak = peak.max(wealth);
            wealth / peak - Decimal::ONE
        })
        .collect();
    returns.with_values(values)
}

/// Annualised Sharpe ratio over a trailing window; undefined during the
/// warm-up and for windows without dispersion.
pub fn rolling_sharpe(
    returns: &StrategyReturnSeries,
    window: usize,
    trading_days_per_year: u32,
) -> Series<Option<Decimal>> {
    let r = returns.values();
    let ann = sqrt_decimal(Decimal::from(trading_days_per_year));
    let values = (0..r.len())
        .map(|t| {
            if window < 2 || t + 1 < window {
                return None;
            }
            let slice = &r[t + 1 - window..=t];
            let s = sample_std(slice).filter(|s| !s.is_zero())?;
            Some(mean(slice)? / s * ann)
        })
        .collect();
    returns.with_values(values)
}

/// The `top` deepest non-overlapping drawdowns, deepest first.
pub fn top_drawdowns(underwater: &Series<Rate>, top: usize) -> Vec<DrawdownPeriod> {
    let dates = underwater.dates();
    let mut live: Vec<(usize, Decimal)> = underwater.values().iter().copied().enumerate().collect();
    let mut periods = Vec::new();

    while periods.len() < top {
        let Some(valley_pos) = deepest(&live) else {
            break;
        };
        let (valley_idx, depth) = live[valley_pos];
        if depth >= Decimal::ZERO {
            break;
        }
        let peak_pos = live[..valley_pos]
            .iter()
            .rposition(|(_, v)| v.is_zero())
            .unwrap_or(0);
        let recovery_pos = live[valley_pos..]
            .iter()
            .position(|(_, v)| v.is_zero())
            .map(|p| p + valley_pos);

        let peak_idx = live[peak_pos].0;
        let recovery_idx = recovery_pos.map(|p| live[p].0);
        periods.push(DrawdownPeriod {
            peak: dates[peak_idx],
            valley: dates[valley_idx],
            recovery: recovery_idx.map(|i| dates[i]),
            depth,
            duration: recovery_idx.map(|i| i - peak_idx),
        });

        match recovery_pos {
            Some(rec) => {
                live.drain(peak_pos + 1..rec);
            }
            None => live.truncate(peak_pos + 1),
        }
    }
    periods
}

fn deepest(live: &[(usize, Decimal)]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (pos, (_, v)) in live.iter().enumerate() {
        if best.map_or(true, |b| *v < live[b].1) {
            best = Some(pos);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::max_drawdown;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
    }

    fn returns(values: &[Decimal]) -> StrategyReturnSeries {
        Series::new((0..values.len()).map(day).collect(), values.to_vec()).unwrap()
    }

    #[test]
    fn test_underwater_curve() {
        let r = returns(&[dec!(0), dec!(0.1), dec!(-0.5), dec!(1), dec!(0.1)]);
        let uw = underwater(&r);
        assert_eq!(
            uw.values().to_vec(),
            vec![dec!(0), dec!(0), dec!(-0.5), dec!(0), dec!(0)]
        );
    }

    #[test]
    fn test_first_period_loss_is_under_water() {
        let r = returns(&[dec!(-0.1), dec!(0.05), dec!(0.1)]);
        let uw = underwater(&r);
        // wealth 0.9, 0.945, 1.0395 against a starting peak of 1
        assert_eq!(
            uw.values().to_vec(),
            vec![dec!(-0.1), dec!(-0.055), dec!(0)]
        );
        let deepest = uw.values().iter().copied().min().unwrap();
        assert_eq!(deepest, max_drawdown(r.values()));

        let periods = top_drawdowns(&uw, 10);
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].depth, dec!(-0.1));
        assert_eq!(periods[0].valley, day(0));
        assert_eq!(periods[0].recovery, Some(day(2)));
    }

    #[test]
    fn test_top_drawdowns_ordered_by_depth() {
        // two episodes: -10% recovered, then -50% never recovered
        let r = returns(&[
            dec!(0),
            dec!(-0.1),
            dec!(0.2),
            dec!(0),
            dec!(-0.5),
            dec!(0.1),
        ]);
        let periods = top_drawdowns(&underwater(&r), 10);
        assert_eq!(periods.len(), 2);

        assert_eq!(periods[0].depth, dec!(-0.5));
        assert_eq!(periods[0].peak, day(3));
        assert_eq!(periods[0].valley, day(4));
        assert_eq!(periods[0].recovery, None);

        assert_eq!(periods[1].depth, dec!(-0.1));
        assert_eq!(periods[1].peak, day(0));
        assert_eq!(periods[1].valley, day(1));
        assert_eq!(periods[1].recovery, Some(day(2)));
        assert_eq!(periods[1].duration, Some(2));
    }

    #[test]
    fn test_no_drawdown_no_periods() {
        let r = returns(&[dec!(0), dec!(0.01), dec!(0.02)]);
        assert!(top_drawdowns(&underwater(&r), 10).is_empty());
    }

    #[test]
    fn test_top_limits_count() {
        let mut v = Vec::new();
        for _ in 0..5 {
            v.push(dec!(-0.1));
            v.push(dec!(0.2));
        }
        let periods = top_drawdowns(&underwater(&returns(&v)), 3);
        assert_eq!(periods.len(), 3);
    }

    #[test]
    fn test_rolling_sharpe_warm_up() {
        let r = returns(&[dec!(0.01), dec!(0.02), dec!(0.03), dec!(0.01)]);
        let rs = rolling_sharpe(&r, 3, 252);
        assert_eq!(rs.values()[0], None);
        assert_eq!(rs.values()[1], None);
        // window [0.01, 0.02, 0.03]: mean 0.02, std 0.01
        let expected = dec!(2) * sqrt_decimal(dec!(252));
        assert!((rs.values()[2].unwrap() - expected).abs() < dec!(0.0000001));
        assert!(rs.values()[3].is_some());
    }

    #[test]
    fn test_chart_data_shares_index() {
        let r = returns(&[dec!(0), dec!(0.01), dec!(-0.02), dec!(0.03)]);
        let charts = chart_data(&r, 2, 252).unwrap();
        assert!(charts.cumulative_returns.shares_index_with(&r));
        assert!(charts.rolling_sharpe.shares_index_with(&r));
        assert!(charts.underwater.shares_index_with(&r));
        assert!(chart_data(&r, 1, 252).is_err());
    }
}
