use chrono::NaiveDate;
use clap::Args;
use pairs_trading_core::analyzer::analyze_spread;
use pairs_trading_core::config::HedgeRatioEstimation;
use pairs_trading_core::with_metadata;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use super::{load_config, load_prices, PairArgs, SpreadArgs};

/// Arguments for the spread z-score
#[derive(Args)]
pub struct ZScoreArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    #[command(flatten)]
    pub spread: SpreadArgs,
}

#[derive(Debug, Serialize)]
struct ZScoreRow {
    date: NaiveDate,
    spread: Option<Decimal>,
    rolling_mean: Option<Decimal>,
    rolling_std: Option<Decimal>,
    zscore: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct ZScoreOutput {
    first: String,
    second: String,
    hedge_ratio: Decimal,
    intercept: Decimal,
    window: usize,
    current_zscore: Option<Decimal>,
    rows: Vec<ZScoreRow>,
}

pub fn run_zscore(args: ZScoreArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut config = load_config(&args.pair)?;
    args.spread.apply(&mut config);
    config.validate()?;

    let prices = load_prices(&args.pair)?;
    let analysis = analyze_spread(&prices, config.zscore_window, config.hedge_ratio)?;

    let mut warnings = Vec::new();
    if analysis.estimation == HedgeRatioEstimation::FullSample {
        warnings.push(
            "Hedge ratio is fitted on the full sample, so earlier spread values use later prices"
                .to_string(),
        );
    }

    let rows: Vec<ZScoreRow> = analysis
        .zscores
        .iter()
        .enumerate()
        .map(|(i, (date, z))| ZScoreRow {
            date: *date,
            spread: analysis.spread.values()[i],
            rolling_mean: analysis.rolling_mean.values()[i],
            rolling_std: analysis.rolling_std.values()[i],
            zscore: *z,
        })
        .collect();
    let instruments = prices.instruments();
    let output = ZScoreOutput {
        first: instruments.first,
        second: instruments.second,
        hedge_ratio: analysis.hedge_ratio,
        intercept: analysis.intercept,
        window: analysis.window,
        current_zscore: analysis.zscores.values().last().copied().flatten(),
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let envelope = with_metadata(
        "OLS log-price hedge ratio; rolling z-score of the spread",
        &serde_json::json!({
            "window": config.zscore_window,
            "hedge_ratio": config.hedge_ratio,
        }),
        warnings,
        elapsed,
        output,
    );
    Ok(serde_json::to_value(envelope)?)
}
