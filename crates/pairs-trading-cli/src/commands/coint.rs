use clap::Args;
use pairs_trading_core::analyzer::johansen;
use pairs_trading_core::config::SignificanceLevel;
use pairs_trading_core::with_metadata;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use super::{load_config, load_prices, Confidence, PairArgs};

/// Arguments for the Johansen test alone
#[derive(Args)]
pub struct CointArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    /// Deterministic terms: -1 none, 0 constant, 1 linear trend
    #[arg(long, allow_hyphen_values = true)]
    pub det_order: Option<i32>,

    /// Lagged differences in the VECM
    #[arg(long)]
    pub k_ar_diff: Option<usize>,

    /// Confidence level of the critical values
    #[arg(long, value_enum)]
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Serialize)]
struct CointOutput {
    first: String,
    second: String,
    observations: usize,
    effective_observations: usize,
    significance: SignificanceLevel,
    eigenvalues: Vec<Decimal>,
    trace_statistics: Vec<Decimal>,
    critical_values: Vec<Decimal>,
    max_eigen_statistics: Vec<Decimal>,
    max_eigen_critical_values: Vec<Decimal>,
    rank: usize,
    cointegrated: bool,
}

pub fn run_coint(args: CointArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut config = load_config(&args.pair)?;
    if let Some(det_order) = args.det_order {
        config.johansen.det_order = det_order;
    }
    if let Some(k) = args.k_ar_diff {
        config.johansen.k_ar_diff = k;
    }
    if let Some(level) = args.confidence {
        config.significance = level.into();
    }

    let prices = load_prices(&args.pair)?;
    let result = johansen(&prices, &config.johansen)?;
    let level = config.significance;
    let instruments = prices.instruments();

    let output = CointOutput {
        first: instruments.first,
        second: instruments.second,
        observations: prices.len(),
        effective_observations: result.effective_observations,
        significance: level,
        critical_values: result.critical_values_at(level),
        max_eigen_critical_values: result
            .max_eigen_critical_values
            .iter()
            .map(|c| c.at(level))
            .collect(),
        rank: result.rank(level),
        cointegrated: result.is_cointegrated(level),
        eigenvalues: result.eigenvalues,
        trace_statistics: result.trace_statistics,
        max_eigen_statistics: result.max_eigen_statistics,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let envelope = with_metadata(
        "Johansen cointegration test on closing price levels",
        &serde_json::json!({
            "det_order": config.johansen.det_order,
            "k_ar_diff": config.johansen.k_ar_diff,
            "significance": level,
        }),
        Vec::new(),
        elapsed,
        output,
    );
    Ok(serde_json::to_value(envelope)?)
}
