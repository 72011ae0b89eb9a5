mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analyze::AnalyzeArgs;
use commands::backtest::BacktestArgs;
use commands::coint::CointArgs;
use commands::risk::RiskArgs;
use commands::zscore::ZScoreArgs;

/// Cointegration tests and z-score backtests for pairs of instruments
#[derive(Parser)]
#[command(
    name = "pairs",
    version,
    about = "Cointegration tests and z-score backtests for pairs of instruments",
    long_about = "A CLI for statistical-arbitrage research with decimal precision. \
                  Runs the Johansen test on a pair of price series and, when they are \
                  cointegrated, backtests a z-score mean-reversion strategy on the \
                  spread and reports its risk statistics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr (RUST_LOG is honoured otherwise)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full analysis: Johansen test, then backtest, risk and chart data
    Analyze(AnalyzeArgs),
    /// Johansen cointegration test only
    Coint(CointArgs),
    /// Hedge ratio, spread and rolling z-score
    Zscore(ZScoreArgs),
    /// Backtest the z-score strategy without the cointegration gate
    Backtest(BacktestArgs),
    /// Performance statistics for a series of periodic returns
    Risk(RiskArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Coint(args) => commands::coint::run_coint(args),
        Commands::Zscore(args) => commands::zscore::run_zscore(args),
        Commands::Backtest(args) => commands::backtest::run_backtest_command(args),
        Commands::Risk(args) => commands::risk::run_risk(args),
        Commands::Version => {
            println!("pairs {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
