use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use crate::analytics::{chart_data, ChartData, PerfStats, RiskAnalytics, RiskSummary};
use crate::analyzer::{analyze_spread, johansen, JohansenResult, SpreadAnalysis};
use crate::backtester::{run_backtest, BacktestReport};
use crate::config::{AnalysisConfig, HedgeRatioEstimation, SignificanceLevel};
use crate::data::{pull, PriceProvider};
use crate::series::PricePair;
use crate::types::{with_metadata, ComputationOutput, InstrumentPair};
use crate::{PairsTradingError, PairsTradingResult};

const METHODOLOGY: &str =
    "Johansen trace test on price levels; OLS log spread z-score signals; one-period lagged backtest";

/// Everything needed to analyse one pair from a price provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub instruments: InstrumentPair,
    pub lookback_days: u32,
    /// Last calendar date of the lookback window
    pub as_of: NaiveDate,
    #[serde(default)]
    pub config: AnalysisConfig,
}

/// Stages that only run once cointegration is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyEvaluation {
    pub spread: SpreadAnalysis,
    pub backtest: BacktestReport,
    pub risk: RiskSummary,
    pub charts: ChartData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CointegrationVerdict {
    Accepted(Box<StrategyEvaluation>),
    /// No trace statistic beat its critical value; nothing was backtested
    Rejected,
}

impl CointegrationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CointegrationVerdict::Accepted(_))
    }

    pub fn evaluation(&self) -> Option<&StrategyEvaluation> {
        match self {
            CointegrationVerdict::Accepted(e) => Some(e),
            CointegrationVerdict::Rejected => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairAnalysis {
    pub instruments: InstrumentPair,
    pub observations: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub significance: SignificanceLevel,
    pub johansen: JohansenResult,
    pub verdict: CointegrationVerdict,
}

/// Pull prices for the requested pair and run the full analysis.
pub fn analyze_pair<P: PriceProvider + ?Sized>(
    provider: &P,
    request: &AnalysisRequest,
) -> PairsTradingResult<ComputationOutput<PairAnalysis>> {
    request.config.validate()?;
    let prices = pull(
        provider,
        &request.instruments,
        request.lookback_days,
        request.as_of,
    )?;
    analyze_prices(&prices, &request.config)
}

/// Cointegration test, then spread, backtest and statistics when the pair
/// is cointegrated.
pub fn analyze_prices(
    prices: &PricePair,
    config: &AnalysisConfig,
) -> PairsTradingResult<ComputationOutput<PairAnalysis>> {
    let analytics = PerfStats {
        trading_days_per_year: config.trading_days_per_year,
    };
    analyze_prices_with(prices, config, &analytics)
}

/// As [`analyze_prices`], with a caller-supplied statistics provider.
pub fn analyze_prices_with<A: RiskAnalytics + ?Sized>(
    prices: &PricePair,
    config: &AnalysisConfig,
    analytics: &A,
) -> PairsTradingResult<ComputationOutput<PairAnalysis>> {
    let start = Instant::now();
    config.validate()?;
    // Checked before the test so a short history never yields a verdict.
    if prices.len() < config.zscore_window {
        return Err(PairsTradingError::InsufficientHistory {
            required: config.zscore_window,
            actual: prices.len(),
        });
    }
    let mut warnings: Vec<String> = Vec::new();

    let test = johansen(prices, &config.johansen)?;
    let analysis = evaluate(prices, config, test, analytics, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        METHODOLOGY,
        &serde_json::json!({
            "instruments": &analysis.instruments,
            "observations": analysis.observations,
            "zscore_window": config.zscore_window,
            "entry_threshold": config.thresholds.entry.to_string(),
            "exit_threshold": config.thresholds.exit.to_string(),
            "det_order": config.johansen.det_order,
            "k_ar_diff": config.johansen.k_ar_diff,
            "significance": config.significance,
            "hedge_ratio": config.hedge_ratio,
            "trading_days_per_year": config.trading_days_per_year,
        }),
        warnings,
        elapsed,
        analysis,
    ))
}

/// Branches on the test result. Rejection stops here.
pub(crate) fn evaluate<A: RiskAnalytics + ?Sized>(
    prices: &PricePair,
    config: &AnalysisConfig,
    test: JohansenResult,
    analytics: &A,
    warnings: &mut Vec<String>,
) -> PairsTradingResult<PairAnalysis> {
    let dates = prices.dates();
    let accepted = test.is_cointegrated(config.significance);
    info!(
        accepted,
        rank = test.rank(config.significance),
        trace = ?test.trace_statistics,
        "cointegration verdict"
    );

    let verdict = if accepted {
        CointegrationVerdict::Accepted(Box::new(evaluate_strategy(
            prices, config, analytics, warnings,
        )?))
    } else {
        CointegrationVerdict::Rejected
    };

    Ok(PairAnalysis {
        instruments: prices.instruments(),
        observations: prices.len(),
        start: dates.first().copied().unwrap_or_default(),
        end: dates.last().copied().unwrap_or_default(),
        significance: config.significance,
        johansen: test,
        verdict,
    })
}

fn evaluate_strategy<A: RiskAnalytics + ?Sized>(
    prices: &PricePair,
    config: &AnalysisConfig,
    analytics: &A,
    warnings: &mut Vec<String>,
) -> PairsTradingResult<StrategyEvaluation> {
    let spread = analyze_spread(prices, config.zscore_window, config.hedge_ratio)?;
    if config.hedge_ratio == HedgeRatioEstimation::FullSample {
        warn!("hedge ratio fitted on the full sample");
        warnings.push(
            "Hedge ratio is fitted on the full sample, so earlier spread values use later prices"
                .into(),
        );
    }
    let degenerate = spread
        .rolling_std
        .values()
        .iter()
        .filter(|s| s.is_some_and(|s| s.is_zero()))
        .count();
    if degenerate > 0 {
        warn!(degenerate, "rolling windows without dispersion");
        warnings.push(format!(
            "{} z-scores undefined: rolling standard deviation was zero",
            degenerate
        ));
    }

    let backtest = run_backtest(prices, &spread.zscores, &config.thresholds)?;
    if backtest.periods_in_market == 0 {
        warnings.push("No position was opened over the sample".into());
    }

    let risk = analytics.summarize(&backtest.returns)?;
    let charts = chart_data(
        &backtest.returns,
        config.rolling_sharpe_window,
        config.trading_days_per_year,
    )?;
    info!(
        total_return = %backtest.total_return,
        hedge_ratio = %spread.hedge_ratio,
        "strategy evaluated"
    );

    Ok(StrategyEvaluation {
        spread,
        backtest,
        risk,
        charts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::critical_values::{max_eigen_critical_values, trace_critical_values};
    use crate::series::{PricePoint, PriceSeries};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn wavy_pair(n: usize) -> PricePair {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let leg = |name: &str, base: Decimal, phase: usize| {
            let points = (0..n)
                .map(|i| {
                    let wiggle = match (i + phase) % 5 {
                        0 => dec!(0),
                        1 => dec!(1.2),
                        2 => dec!(-0.7),
                        3 => dec!(2.1),
                        _ => dec!(-1.4),
                    };
                    PricePoint {
                        date: start + Duration::days(i as i64),
                        close: base + Decimal::from(i as i64) * dec!(0.05) + wiggle,
                    }
                })
                .collect();
            PriceSeries::new(name, points)
        };
        PricePair::new(leg("AAA", dec!(40), 0), leg("BBB", dec!(60), 2)).unwrap()
    }

    fn synthetic_test(trace: [Decimal; 2]) -> JohansenResult {
        JohansenResult {
            eigenvalues: vec![dec!(0.1), dec!(0.01)],
            trace_statistics: trace.to_vec(),
            max_eigen_statistics: trace.to_vec(),
            trace_critical_values: vec![
                trace_critical_values(2, 0).unwrap(),
                trace_critical_values(1, 0).unwrap(),
            ],
            max_eigen_critical_values: vec![
                max_eigen_critical_values(2, 0).unwrap(),
                max_eigen_critical_values(1, 0).unwrap(),
            ],
            effective_observations: 80,
            det_order: 0,
            k_ar_diff: 1,
        }
    }

    #[test]
    fn test_rejection_skips_backtest() {
        let prices = wavy_pair(80);
        let mut warnings = Vec::new();
        let analysis = evaluate(
            &prices,
            &AnalysisConfig::default(),
            synthetic_test([dec!(1), dec!(0.5)]),
            &PerfStats::default(),
            &mut warnings,
        )
        .unwrap();
        assert!(!analysis.verdict.is_accepted());
        assert!(analysis.verdict.evaluation().is_none());
        assert!(warnings.is_empty());
        assert_eq!(analysis.observations, 80);
    }

    #[test]
    fn test_acceptance_runs_every_stage() {
        let prices = wavy_pair(80);
        let mut warnings = Vec::new();
        let analysis = evaluate(
            &prices,
            &AnalysisConfig::default(),
            synthetic_test([dec!(40), dec!(1)]),
            &PerfStats::default(),
            &mut warnings,
        )
        .unwrap();
        let eval = analysis.verdict.evaluation().unwrap();
        assert_eq!(eval.spread.zscores.len(), 80);
        assert_eq!(eval.backtest.returns.len(), 80);
        assert!(eval.backtest.returns.shares_index_with(&eval.spread.zscores));
        assert_eq!(eval.risk.statistics.len(), 13);
        assert!(warnings.iter().any(|w| w.contains("full sample")));
    }

    #[test]
    fn test_accepted_with_short_history_fails() {
        let prices = wavy_pair(20);
        let mut warnings = Vec::new();
        let result = evaluate(
            &prices,
            &AnalysisConfig::default(),
            synthetic_test([dec!(40), dec!(1)]),
            &PerfStats::default(),
            &mut warnings,
        );
        assert!(matches!(
            result,
            Err(crate::PairsTradingError::InsufficientHistory {
                required: 30,
                actual: 20
            })
        ));
    }

    #[test]
    fn test_verdict_serializes_with_tag() {
        let json = serde_json::to_value(CointegrationVerdict::Rejected).unwrap();
        assert_eq!(json["verdict"], "rejected");
    }
}
