use clap::Args;
use pairs_trading_core::pipeline::{analyze_pair, analyze_prices, AnalysisRequest, PairAnalysis};
use pairs_trading_core::ComputationOutput;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{info, warn};

use super::{load_config, load_prices, serde_key, Confidence, PairArgs, SpreadArgs};
use crate::input::prices::CsvPriceProvider;
use crate::output::charts::export_charts;

/// Arguments for the full pipeline
#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    #[command(flatten)]
    pub spread: SpreadArgs,

    /// Confidence level of the cointegration verdict
    #[arg(long, value_enum)]
    pub confidence: Option<Confidence>,

    /// Write cumulative_returns.csv, rolling_sharpe.csv and drawdown.csv here
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Emit every series instead of the summary
    #[arg(long)]
    pub full: bool,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.pair)?;
    args.spread.apply(&mut config);
    if let Some(level) = args.confidence {
        config.significance = level.into();
    }

    let output = match args.pair.instruments().filter(|_| args.pair.input.is_none()) {
        Some(instruments) => {
            let provider = CsvPriceProvider::new(&args.pair.data_dir);
            let request = AnalysisRequest {
                instruments,
                lookback_days: args.pair.days,
                as_of: args.pair.as_of(),
                config,
            };
            analyze_pair(&provider, &request)?
        }
        None => analyze_prices(&load_prices(&args.pair)?, &config)?,
    };

    if let Some(dir) = &args.export_dir {
        match output.result.verdict.evaluation() {
            Some(eval) => {
                let written = export_charts(dir, &eval.charts)?;
                info!(files = written.len(), dir = %dir.display(), "chart data exported");
            }
            None => warn!("pair is not cointegrated, no chart data to export"),
        }
    }

    if args.full {
        return Ok(serde_json::to_value(&output)?);
    }
    Ok(summarize(&output))
}

/// Flat view of the analysis: the verdict, the headline backtest figures and
/// one field per risk statistic.
fn summarize(output: &ComputationOutput<PairAnalysis>) -> Value {
    let a = &output.result;
    let mut result = Map::new();
    result.insert("first".into(), json!(a.instruments.first));
    result.insert("second".into(), json!(a.instruments.second));
    result.insert("observations".into(), json!(a.observations));
    result.insert("start".into(), json!(a.start));
    result.insert("end".into(), json!(a.end));
    result.insert(
        "verdict".into(),
        json!(if a.verdict.is_accepted() {
            "cointegrated"
        } else {
            "not cointegrated"
        }),
    );
    result.insert("trace_statistics".into(), json!(a.johansen.trace_statistics));
    result.insert(
        "critical_values".into(),
        json!(a.johansen.critical_values_at(a.significance)),
    );
    result.insert("rank".into(), json!(a.johansen.rank(a.significance)));

    if let Some(eval) = a.verdict.evaluation() {
        result.insert("hedge_ratio".into(), json!(eval.spread.hedge_ratio));
        result.insert("total_return".into(), json!(eval.backtest.total_return));
        result.insert("final_position".into(), json!(eval.backtest.final_position));
        result.insert("position_changes".into(), json!(eval.backtest.position_changes));
        result.insert("periods_in_market".into(), json!(eval.backtest.periods_in_market));
        for stat in eval.risk.iter() {
            result.insert(serde_key(&stat.metric), json!(stat.value));
        }
    }

    json!({
        "result": result,
        "methodology": output.methodology,
        "assumptions": output.assumptions,
        "warnings": output.warnings,
        "metadata": output.metadata,
    })
}
