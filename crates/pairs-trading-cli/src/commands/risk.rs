use clap::Args;
use pairs_trading_core::analytics::risk_summary;
use pairs_trading_core::config::DEFAULT_TRADING_DAYS;
use pairs_trading_core::with_metadata;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::time::Instant;

use super::serde_key;
use crate::input;

/// Arguments for performance statistics of a return series
#[derive(Args)]
pub struct RiskArgs {
    /// JSON file: an array of returns or an object with a "returns" array
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated periodic returns (e.g. "0.01,-0.004,0.002")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub returns: Option<Vec<Decimal>>,

    /// Periods per year for annualisation
    #[arg(long, default_value_t = DEFAULT_TRADING_DAYS)]
    pub trading_days: u32,
}

fn parse_return(v: &Value) -> Result<Decimal, Box<dyn std::error::Error>> {
    let text = match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(format!("Not a return value: {}", other).into()),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| format!("Invalid return '{}': {}", text, e).into())
}

fn returns_from_value(data: &Value) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    let arr = match data {
        Value::Array(arr) => arr,
        Value::Object(obj) => obj
            .get("returns")
            .and_then(|v| v.as_array())
            .ok_or("JSON object must contain a 'returns' array")?,
        _ => return Err("Expected a JSON array of returns or object with 'returns' key".into()),
    };
    arr.iter().map(parse_return).collect()
}

fn get_returns(args: &RiskArgs) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    if let Some(path) = &args.input {
        return returns_from_value(&input::file::read_json_value(path)?);
    }
    if let Some(returns) = &args.returns {
        return Ok(returns.clone());
    }
    if let Some(data) = input::stdin::read_stdin::<Value>()? {
        return returns_from_value(&data);
    }
    Err("Provide --returns or --input file or pipe JSON via stdin".into())
}

pub fn run_risk(args: RiskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let returns = get_returns(&args)?;
    let summary = risk_summary(&returns, args.trading_days)?;

    let mut result = Map::new();
    result.insert("observations".into(), json!(summary.observations));
    for stat in summary.iter() {
        result.insert(serde_key(&stat.metric), json!(stat.value));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let envelope = with_metadata(
        "Daily-return performance statistics",
        &json!({ "trading_days_per_year": args.trading_days }),
        Vec::new(),
        elapsed,
        Value::Object(result),
    );
    Ok(serde_json::to_value(envelope)?)
}
