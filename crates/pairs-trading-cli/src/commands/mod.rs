pub mod analyze;
pub mod backtest;
pub mod coint;
pub mod risk;
pub mod zscore;

use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use pairs_trading_core::config::{AnalysisConfig, HedgeRatioEstimation, SignificanceLevel};
use pairs_trading_core::data::pull;
use pairs_trading_core::series::PricePair;
use pairs_trading_core::InstrumentPair;
use serde_json::Value;
use std::path::PathBuf;

use crate::input;
use crate::input::prices::CsvPriceProvider;

/// Where the two price series come from. Shared by every pair command.
#[derive(Args, Debug, Clone)]
pub struct PairArgs {
    /// First instrument (regressor of the hedge ratio)
    #[arg(long, requires = "ticker2")]
    pub ticker1: Option<String>,

    /// Second instrument
    #[arg(long, requires = "ticker1")]
    pub ticker2: Option<String>,

    /// Lookback window in calendar days
    #[arg(long, default_value_t = 365)]
    pub days: u32,

    /// Directory holding one <TICKER>.csv per instrument (date,close)
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Last date of the lookback window (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// JSON file holding a price pair ({"first": {...}, "second": {...}})
    #[arg(long, conflicts_with_all = ["ticker1", "ticker2"])]
    pub input: Option<String>,

    /// Analysis config file (.yaml, .yml or .json)
    #[arg(long)]
    pub config: Option<String>,
}

impl PairArgs {
    pub fn instruments(&self) -> Option<InstrumentPair> {
        match (&self.ticker1, &self.ticker2) {
            (Some(a), Some(b)) => Some(InstrumentPair::new(a.as_str(), b.as_str())),
            _ => None,
        }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Overrides for the spread stage, applied on top of the config file.
#[derive(Args, Debug, Clone)]
pub struct SpreadArgs {
    /// Rolling window for the z-score
    #[arg(long)]
    pub window: Option<usize>,

    /// Re-estimate the hedge ratio on an expanding window starting after
    /// this many observations instead of once on the full sample
    #[arg(long)]
    pub expanding: Option<usize>,
}

impl SpreadArgs {
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(window) = self.window {
            config.zscore_window = window;
        }
        if let Some(min_periods) = self.expanding {
            config.hedge_ratio = HedgeRatioEstimation::Expanding { min_periods };
        }
    }
}

/// Critical-value column used for the verdict.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Confidence {
    #[value(name = "90")]
    Ninety,
    #[value(name = "95")]
    NinetyFive,
    #[value(name = "99")]
    NinetyNine,
}

impl From<Confidence> for SignificanceLevel {
    fn from(c: Confidence) -> Self {
        match c {
            Confidence::Ninety => SignificanceLevel::Ninety,
            Confidence::NinetyFive => SignificanceLevel::NinetyFive,
            Confidence::NinetyNine => SignificanceLevel::NinetyNine,
        }
    }
}

pub fn load_config(args: &PairArgs) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => input::file::read_structured(path)?,
        None => AnalysisConfig::default(),
    };
    Ok(config)
}

/// Prices from `--input`, then CSV files for `--ticker1/--ticker2`, then
/// stdin.
pub fn load_prices(args: &PairArgs) -> Result<PricePair, Box<dyn std::error::Error>> {
    if let Some(path) = &args.input {
        return input::file::read_json(path);
    }
    if let Some(instruments) = args.instruments() {
        let provider = CsvPriceProvider::new(&args.data_dir);
        return Ok(pull(&provider, &instruments, args.days, args.as_of())?);
    }
    if let Some(pair) = input::stdin::read_stdin::<PricePair>()? {
        return Ok(pair);
    }
    Err("Provide --ticker1 and --ticker2, --input file or pipe a JSON price pair via stdin".into())
}

/// snake_case name a serde enum serialises to.
pub fn serde_key<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}
