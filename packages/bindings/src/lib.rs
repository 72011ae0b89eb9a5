use napi::Result as NapiResult;
use napi_derive::napi;
use pairs_trading_core::config::{
    AnalysisConfig, HedgeRatioEstimation, JohansenSpec, SignalThresholds, DEFAULT_TRADING_DAYS,
    DEFAULT_ZSCORE_WINDOW,
};
use pairs_trading_core::series::{PricePair, ZScoreSeries};
use pairs_trading_core::Rate;
use serde::Deserialize;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn default_window() -> usize {
    DEFAULT_ZSCORE_WINDOW
}

fn default_trading_days() -> u32 {
    DEFAULT_TRADING_DAYS
}

#[derive(Deserialize)]
struct AnalyzeInput {
    prices: PricePair,
    #[serde(default)]
    config: AnalysisConfig,
}

#[derive(Deserialize)]
struct CointegrationInput {
    prices: PricePair,
    #[serde(default)]
    johansen: JohansenSpec,
}

#[derive(Deserialize)]
struct SpreadInput {
    prices: PricePair,
    #[serde(default = "default_window")]
    window: usize,
    #[serde(default)]
    hedge_ratio: HedgeRatioEstimation,
}

#[derive(Deserialize)]
struct BacktestInput {
    prices: PricePair,
    zscores: ZScoreSeries,
    #[serde(default)]
    thresholds: SignalThresholds,
}

#[derive(Deserialize)]
struct RiskInput {
    returns: Vec<Rate>,
    #[serde(default = "default_trading_days")]
    trading_days_per_year: u32,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_prices(input_json: String) -> NapiResult<String> {
    let input: AnalyzeInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.config.validate().map_err(to_napi_error)?;
    let output = pairs_trading_core::pipeline::analyze_prices(&input.prices, &input.config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

#[napi]
pub fn cointegration_test(input_json: String) -> NapiResult<String> {
    let input: CointegrationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pairs_trading_core::analyzer::johansen(&input.prices, &input.johansen)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn spread_zscore(input_json: String) -> NapiResult<String> {
    let input: SpreadInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        pairs_trading_core::analyzer::analyze_spread(&input.prices, input.window, input.hedge_ratio)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Backtester and analytics
// ---------------------------------------------------------------------------

#[napi]
pub fn backtest(input_json: String) -> NapiResult<String> {
    let input: BacktestInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pairs_trading_core::backtester::run_backtest(
        &input.prices,
        &input.zscores,
        &input.thresholds,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn risk_summary(input_json: String) -> NapiResult<String> {
    let input: RiskInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        pairs_trading_core::analytics::risk_summary(&input.returns, input.trading_days_per_year)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
