use chrono::NaiveDate;
use clap::Args;
use pairs_trading_core::analyzer::{analyze_spread, johansen};
use pairs_trading_core::backtester::{run_backtest, Position};
use pairs_trading_core::config::HedgeRatioEstimation;
use pairs_trading_core::with_metadata;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::warn;

use super::{load_config, load_prices, PairArgs, SpreadArgs};

/// Arguments for the signal backtest
#[derive(Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    #[command(flatten)]
    pub spread: SpreadArgs,

    /// |z| above this opens a position
    #[arg(long)]
    pub entry: Option<Decimal>,

    /// |z| at or below this closes it
    #[arg(long)]
    pub exit: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct BacktestRow {
    date: NaiveDate,
    zscore: Option<Decimal>,
    position: i8,
    lagged_position: Option<i8>,
    differential_return: Option<Decimal>,
    strategy_return: Decimal,
    cumulative_return: Decimal,
}

#[derive(Debug, Serialize)]
struct BacktestOutput {
    first: String,
    second: String,
    hedge_ratio: Decimal,
    total_return: Decimal,
    final_position: Position,
    position_changes: usize,
    periods_in_market: usize,
    rows: Vec<BacktestRow>,
}

pub fn run_backtest_command(args: BacktestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut config = load_config(&args.pair)?;
    args.spread.apply(&mut config);
    if let Some(entry) = args.entry {
        config.thresholds.entry = entry;
    }
    if let Some(exit) = args.exit {
        config.thresholds.exit = exit;
    }
    config.validate()?;

    let prices = load_prices(&args.pair)?;
    let mut warnings = Vec::new();

    // The stage runs regardless of the verdict; say so when it is negative.
    let test = johansen(&prices, &config.johansen)?;
    if !test.is_cointegrated(config.significance) {
        warn!("backtesting a pair that is not cointegrated");
        warnings.push("Pair is not cointegrated at the configured level".to_string());
    }
    if config.hedge_ratio == HedgeRatioEstimation::FullSample {
        warnings.push(
            "Hedge ratio is fitted on the full sample, so earlier spread values use later prices"
                .to_string(),
        );
    }

    let spread = analyze_spread(&prices, config.zscore_window, config.hedge_ratio)?;
    let report = run_backtest(&prices, &spread.zscores, &config.thresholds)?;

    let rows = report
        .periods
        .iter()
        .map(|p| BacktestRow {
            date: p.date,
            zscore: p.zscore,
            position: p.position.value(),
            lagged_position: p.lagged_position.map(|l| l.value()),
            differential_return: p.differential_return,
            strategy_return: p.strategy_return,
            cumulative_return: p.cumulative_return,
        })
        .collect();
    let output = BacktestOutput {
        first: report.instruments.first.clone(),
        second: report.instruments.second.clone(),
        hedge_ratio: spread.hedge_ratio,
        total_return: report.total_return,
        final_position: report.final_position,
        position_changes: report.position_changes,
        periods_in_market: report.periods_in_market,
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let envelope = with_metadata(
        "Z-score threshold signals, hold-previous positions, one-period execution lag",
        &serde_json::json!({
            "entry_threshold": config.thresholds.entry.to_string(),
            "exit_threshold": config.thresholds.exit.to_string(),
            "window": config.zscore_window,
            "hedge_ratio": config.hedge_ratio,
        }),
        warnings,
        elapsed,
        output,
    );
    Ok(serde_json::to_value(envelope)?)
}
