use chrono::{Duration, NaiveDate};
use pairs_trading_core::analytics::{risk_summary, RiskMetric};
use pairs_trading_core::config::{AnalysisConfig, HedgeRatioEstimation};
use pairs_trading_core::data::InMemoryProvider;
use pairs_trading_core::pipeline::{analyze_pair, analyze_prices, AnalysisRequest};
use pairs_trading_core::series::{PricePair, PricePoint, PriceSeries};
use pairs_trading_core::{InstrumentPair, PairsTradingError};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn lcg(state: &mut u64) -> Decimal {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    Decimal::new(((*state >> 33) % 2001) as i64 - 1000, 3)
}

fn legs(n: usize) -> (PriceSeries, PriceSeries) {
    let mut state = 7u64;
    let mut p1 = dec!(100);
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    for i in 0..n {
        p1 *= Decimal::ONE + dec!(0.01) * lcg(&mut state);
        let p2 = p1 * dec!(0.5) * (Decimal::ONE + dec!(0.02) * lcg(&mut state));
        let date = start() + Duration::days(i as i64);
        a.push(PricePoint { date, close: p1 });
        b.push(PricePoint { date, close: p2 });
    }
    (PriceSeries::new("KO", a), PriceSeries::new("PEP", b))
}

fn provider(n: usize) -> InMemoryProvider {
    let (a, b) = legs(n);
    InMemoryProvider::new().with_series(a).with_series(b)
}

fn request(lookback_days: u32, as_of_offset: i64) -> AnalysisRequest {
    AnalysisRequest {
        instruments: InstrumentPair::new("KO", "PEP"),
        lookback_days,
        as_of: start() + Duration::days(as_of_offset),
        config: AnalysisConfig::default(),
    }
}

// ===========================================================================
// Full pipeline
// ===========================================================================

#[test]
fn test_cointegrated_pair_runs_end_to_end() {
    let output = analyze_pair(&provider(250), &request(400, 249)).unwrap();
    let analysis = &output.result;

    assert_eq!(analysis.observations, 250);
    assert_eq!(analysis.instruments, InstrumentPair::new("KO", "PEP"));
    assert_eq!(analysis.johansen.trace_statistics.len(), 2);
    assert!(analysis.verdict.is_accepted());

    let eval = analysis.verdict.evaluation().unwrap();
    assert_eq!(eval.backtest.returns.len(), 250);
    assert!(eval.backtest.returns.shares_index_with(&eval.spread.zscores));
    assert_eq!(eval.risk.statistics.len(), 13);
    assert_eq!(
        eval.risk.get(RiskMetric::MaxDrawdown),
        risk_summary(eval.backtest.returns.values(), 252)
            .unwrap()
            .get(RiskMetric::MaxDrawdown)
    );
    assert_eq!(eval.charts.cumulative_returns.len(), 250);

    assert!(output.warnings.iter().any(|w| w.contains("full sample")));
    assert!(!output.methodology.is_empty());
}

#[test]
fn test_lookback_trims_history() {
    let output = analyze_pair(&provider(250), &request(99, 249)).unwrap();
    assert_eq!(output.result.observations, 100);
    assert_eq!(output.result.start, start() + Duration::days(150));
}

#[test]
fn test_expanding_hedge_ratio_has_no_look_ahead_warning() {
    let (a, b) = legs(200);
    let prices = PricePair::new(a, b).unwrap();
    let config = AnalysisConfig {
        hedge_ratio: HedgeRatioEstimation::Expanding { min_periods: 20 },
        ..AnalysisConfig::default()
    };
    let output = analyze_prices(&prices, &config).unwrap();
    assert!(!output.warnings.iter().any(|w| w.contains("full sample")));
    if let Some(eval) = output.result.verdict.evaluation() {
        let spread = eval.spread.spread.values();
        assert!(spread[..19].iter().all(|v| v.is_none()));
    }
}

#[test]
fn test_output_serializes() {
    let output = analyze_pair(&provider(120), &request(200, 119)).unwrap();
    let json = serde_json::to_value(&output).unwrap();
    assert!(json["result"]["verdict"]["verdict"].is_string());
    assert_eq!(json["metadata"]["precision"], "rust_decimal_128bit");
}

// ===========================================================================
// Failures stop the pipeline
// ===========================================================================

#[test]
fn test_unknown_instrument_is_unavailable() {
    let mut req = request(100, 99);
    req.instruments = InstrumentPair::new("KO", "XYZ");
    assert!(matches!(
        analyze_pair(&provider(100), &req),
        Err(PairsTradingError::DataUnavailable(_))
    ));
}

#[test]
fn test_misaligned_legs_are_unavailable() {
    let (a, mut b) = legs(80);
    b.points.remove(40);
    let provider = InMemoryProvider::new().with_series(a).with_series(b);
    assert!(matches!(
        analyze_pair(&provider, &request(100, 79)),
        Err(PairsTradingError::DataUnavailable(_))
    ));
}

#[test]
fn test_tiny_history_is_insufficient() {
    // 5 observations: too few for both the test and the z-score window
    let result = analyze_pair(&provider(250), &request(4, 249));
    assert!(matches!(
        result,
        Err(PairsTradingError::InsufficientHistory {
            required: 30,
            actual: 5
        })
    ));
}

#[test]
fn test_invalid_config_rejected_before_fetch() {
    let mut req = request(100, 99);
    req.config.zscore_window = 0;
    assert!(matches!(
        analyze_pair(&InMemoryProvider::new(), &req),
        Err(PairsTradingError::InvalidInput { .. })
    ));
}
