use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::HedgeRatioEstimation;
use crate::math::{mean, sample_std};
use crate::series::{PricePair, Series, SpreadSeries, ZScoreSeries};
use crate::{PairsTradingError, PairsTradingResult};

/// OLS fit of ln(second) = intercept + slope * ln(first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgeRegression {
    pub intercept: Decimal,
    /// The hedge ratio
    pub slope: Decimal,
    pub observations: usize,
}

/// Spread construction and standardisation for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadAnalysis {
    /// Hedge ratio in force at the last observation
    pub hedge_ratio: Decimal,
    /// Regression intercept at the last observation
    pub intercept: Decimal,
    pub estimation: HedgeRatioEstimation,
    pub window: usize,
    pub spread: SpreadSeries,
    pub rolling_mean: Series<Option<Decimal>>,
    pub rolling_std: Series<Option<Decimal>>,
    pub zscores: ZScoreSeries,
}

/// Slope and intercept of `y` regressed on `x` with a constant.
pub fn ols_hedge_ratio(x: &[Decimal], y: &[Decimal]) -> PairsTradingResult<HedgeRegression> {
    if x.len() != y.len() {
        return Err(PairsTradingError::Alignment(format!(
            "regressor has {} observations, regressand {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(PairsTradingError::InsufficientHistory {
            required: 2,
            actual: x.len(),
        });
    }
    fit(x, y).ok_or_else(|| PairsTradingError::DivisionByZero {
        context: "OLS hedge ratio: log price of the first instrument has zero variance".into(),
    })
}

/// Z-scores of the log spread over a trailing window, hedge ratio fitted on
/// the full sample.
pub fn spread_zscore(prices: &PricePair, window: usize) -> PairsTradingResult<ZScoreSeries> {
    analyze_spread(prices, window, HedgeRatioEstimation::FullSample).map(|a| a.zscores)
}

/// Hedge ratio, spread and rolling z-scores for a pair.
pub fn analyze_spread(
    prices: &PricePair,
    window: usize,
    estimation: HedgeRatioEstimation,
) -> PairsTradingResult<SpreadAnalysis> {
    if window < 2 {
        return Err(PairsTradingError::InvalidInput {
            field: "window".into(),
            reason: "Rolling window must be at least 2".into(),
        });
    }
    let n = prices.len();
    if n < window {
        return Err(PairsTradingError::InsufficientHistory {
            required: window,
            actual: n,
        });
    }

    let (ln_first, ln_second) = prices.log_prices();
    let (regression, spread) = match estimation {
        HedgeRatioEstimation::FullSample => {
            let reg = ols_hedge_ratio(&ln_first, &ln_second)?;
            let spread: Vec<Option<Decimal>> = ln_first
                .iter()
                .zip(ln_second.iter())
                .map(|(x, y)| Some(y - reg.slope * x))
                .collect();
            (reg, spread)
        }
        HedgeRatioEstimation::Expanding { min_periods } => {
            expanding_spread(&ln_first, &ln_second, min_periods)?
        }
    };
    debug!(
        hedge_ratio = %regression.slope,
        intercept = %regression.intercept,
        ?estimation,
        "hedge ratio estimated"
    );

    let (rolling_mean, rolling_std, zscores) = rolling_zscore(&spread, window);
    let dates = prices.dates();

    Ok(SpreadAnalysis {
        hedge_ratio: regression.slope,
        intercept: regression.intercept,
        estimation,
        window,
        spread: Series::new(dates.clone(), spread)?,
        rolling_mean: Series::new(dates.clone(), rolling_mean)?,
        rolling_std: Series::new(dates.clone(), rolling_std)?,
        zscores: Series::new(dates, zscores)?,
    })
}

/// Spread where the hedge ratio at `t` only sees observations `0..=t`.
fn expanding_spread(
    x: &[Decimal],
    y: &[Decimal],
    min_periods: usize,
) -> PairsTradingResult<(HedgeRegression, Vec<Option<Decimal>>)> {
    let mut last = None;
    let mut spread = Vec::with_capacity(x.len());
    for t in 0..x.len() {
        let reg = if t + 1 >= min_periods {
            fit(&x[..=t], &y[..=t])
        } else {
            None
        };
        match reg {
            Some(reg) => {
                spread.push(Some(y[t] - reg.slope * x[t]));
                last = Some(reg);
            }
            None => spread.push(None),
        }
    }
    let last = last.ok_or_else(|| PairsTradingError::InsufficientHistory {
        required: min_periods,
        actual: x.len(),
    })?;
    Ok((last, spread))
}

type RollingColumns = (Vec<Option<Decimal>>, Vec<Option<Decimal>>, Vec<Option<Decimal>>);

/// Trailing mean, sample standard deviation and z-score. A window with any
/// undefined spread value, or with zero dispersion, yields undefined output.
fn rolling_zscore(spread: &[Option<Decimal>], window: usize) -> RollingColumns {
    let n = spread.len();
    let mut means = vec![None; n];
    let mut stds = vec![None; n];
    let mut zscores = vec![None; n];

    for t in (window.saturating_sub(1))..n {
        let slice: Option<Vec<Decimal>> = spread[t + 1 - window..=t].iter().copied().collect();
        let Some(values) = slice else {
            continue;
        };
        let (Some(m), Some(s)) = (mean(&values), sample_std(&values)) else {
            continue;
        };
        means[t] = Some(m);
        stds[t] = Some(s);
        if !s.is_zero() {
            zscores[t] = spread[t].map(|v| (v - m) / s);
        }
    }
    (means, stds, zscores)
}

/// Mean-centred least squares. `None` when `x` has no dispersion.
fn fit(x: &[Decimal], y: &[Decimal]) -> Option<HedgeRegression> {
    let mx = mean(x)?;
    let my = mean(y)?;
    let (sxx, sxy) = x
        .iter()
        .zip(y.iter())
        .fold((Decimal::ZERO, Decimal::ZERO), |(sxx, sxy), (xi, yi)| {
            let dx = xi - mx;
            (sxx + dx * dx, sxy + dx * (yi - my))
        });
    if sxx.is_zero() {
        return None;
    }
    let slope = sxy / sxx;
    Some(HedgeRegression {
        intercept: my - slope * mx,
        slope,
        observations: x.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{PricePoint, PriceSeries};
    use chrono::{Duration, NaiveDate};
    use rust_decimal::MathematicalOps;
    use rust_decimal_macros::dec;

    fn pair_from(first: &[Decimal], second: &[Decimal]) -> PricePair {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let leg = |name: &str, closes: &[Decimal]| {
            PriceSeries::new(
                name,
                closes
                    .iter()
                    .enumerate()
                    .map(|(i, c)| PricePoint {
                        date: start + Duration::days(i as i64),
                        close: *c,
                    })
                    .collect(),
            )
        };
        PricePair::new(leg("A", first), leg("B", second)).unwrap()
    }

    /// A zig-zag around a drift, so log prices are never collinear with time.
    fn wavy(n: usize, base: Decimal) -> Vec<Decimal> {
        (0..n)
            .map(|i| {
                let wiggle = match i % 4 {
                    0 => dec!(0),
                    1 => dec!(1.5),
                    2 => dec!(-0.5),
                    _ => dec!(0.8),
                };
                base + Decimal::from(i as i64) * dec!(0.2) + wiggle
            })
            .collect()
    }

    #[test]
    fn test_hedge_ratio_recovers_slope() {
        let first = wavy(50, dec!(50));
        // ln(second) = 0.3 + 2 ln(first)
        let second: Vec<Decimal> = first
            .iter()
            .map(|p| (dec!(0.3) + dec!(2) * p.ln()).exp())
            .collect();
        let pair = pair_from(&first, &second);
        let (x, y) = pair.log_prices();
        let reg = ols_hedge_ratio(&x, &y).unwrap();
        assert!((reg.slope - dec!(2)).abs() < dec!(0.0001), "{}", reg.slope);
        assert!((reg.intercept - dec!(0.3)).abs() < dec!(0.001));
    }

    #[test]
    fn test_zscore_undefined_during_warm_up() {
        let pair = pair_from(&wavy(60, dec!(50)), &wavy(60, dec!(80)));
        let z = spread_zscore(&pair, 30).unwrap();
        assert_eq!(z.len(), 60);
        for (i, v) in z.values().iter().enumerate() {
            if i < 29 {
                assert!(v.is_none(), "index {} should be undefined", i);
            } else {
                assert!(v.is_some(), "index {} should be defined", i);
            }
        }
    }

    #[test]
    fn test_zscore_matches_manual_window() {
        let pair = pair_from(&wavy(10, dec!(50)), &wavy(10, dec!(80)));
        let a = analyze_spread(&pair, 3, HedgeRatioEstimation::FullSample).unwrap();
        let s: Vec<Decimal> = a.spread.values().iter().map(|v| v.unwrap()).collect();
        let window = &s[5..=7];
        let m = (window[0] + window[1] + window[2]) / dec!(3);
        let var = window.iter().map(|v| (v - m) * (v - m)).sum::<Decimal>() / dec!(2);
        let expected = (s[7] - m) / var.sqrt().unwrap();
        let got = a.zscores.values()[7].unwrap();
        assert!((got - expected).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_insufficient_history() {
        let pair = pair_from(&wavy(29, dec!(50)), &wavy(29, dec!(80)));
        let err = spread_zscore(&pair, 30).unwrap_err();
        assert!(matches!(
            err,
            PairsTradingError::InsufficientHistory {
                required: 30,
                actual: 29
            }
        ));
    }

    #[test]
    fn test_constant_first_leg_fails() {
        let pair = pair_from(&vec![dec!(10); 40], &wavy(40, dec!(80)));
        assert!(matches!(
            spread_zscore(&pair, 30),
            Err(PairsTradingError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_flat_spread_window_is_undefined() {
        let spread = vec![Some(dec!(1)); 5];
        let (means, stds, z) = rolling_zscore(&spread, 3);
        assert_eq!(means[4], Some(dec!(1)));
        assert_eq!(stds[4], Some(dec!(0)));
        assert_eq!(z[4], None);
    }

    #[test]
    fn test_expanding_spread_waits_for_min_periods() {
        let pair = pair_from(&wavy(40, dec!(50)), &wavy(40, dec!(80)));
        let a = analyze_spread(&pair, 5, HedgeRatioEstimation::Expanding { min_periods: 10 })
            .unwrap();
        let spread = a.spread.values();
        assert!(spread[..9].iter().all(|v| v.is_none()));
        assert!(spread[9..].iter().all(|v| v.is_some()));
        let z = a.zscores.values();
        // first full window of defined spread ends at 9 + 5 - 1
        assert!(z[..13].iter().all(|v| v.is_none()));
        assert!(z[13].is_some());
    }

    #[test]
    fn test_expanding_final_ratio_equals_full_sample() {
        let pair = pair_from(&wavy(40, dec!(50)), &wavy(40, dec!(80)));
        let full = analyze_spread(&pair, 5, HedgeRatioEstimation::FullSample).unwrap();
        let exp = analyze_spread(&pair, 5, HedgeRatioEstimation::Expanding { min_periods: 3 })
            .unwrap();
        assert!((full.hedge_ratio - exp.hedge_ratio).abs() < dec!(0.0000001));
        assert_eq!(full.spread.values()[39], exp.spread.values()[39]);
    }
}
