use chrono::NaiveDate;
use pairs_trading_core::analytics::ChartData;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct CumulativeRow {
    date: NaiveDate,
    cumulative_return: Decimal,
}

#[derive(Serialize)]
struct SharpeRow {
    date: NaiveDate,
    rolling_sharpe: Option<Decimal>,
}

#[derive(Serialize)]
struct UnderwaterRow {
    date: NaiveDate,
    drawdown: Decimal,
}

fn write_rows<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the chart series as CSV files under `dir`, creating it if needed.
/// Returns the paths written.
pub fn export_charts(
    dir: &Path,
    charts: &ChartData,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;

    let cumulative = dir.join("cumulative_returns.csv");
    write_rows(
        &cumulative,
        charts.cumulative_returns.iter().map(|(d, v)| CumulativeRow {
            date: *d,
            cumulative_return: *v,
        }),
    )?;

    let sharpe = dir.join("rolling_sharpe.csv");
    write_rows(
        &sharpe,
        charts.rolling_sharpe.iter().map(|(d, v)| SharpeRow {
            date: *d,
            rolling_sharpe: *v,
        }),
    )?;

    let underwater = dir.join("underwater.csv");
    write_rows(
        &underwater,
        charts.underwater.iter().map(|(d, v)| UnderwaterRow {
            date: *d,
            drawdown: *v,
        }),
    )?;

    // DrawdownPeriod already serializes flat
    let drawdowns = dir.join("drawdown.csv");
    write_rows(&drawdowns, charts.drawdown_periods.iter())?;

    Ok(vec![cumulative, sharpe, underwater, drawdowns])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairs_trading_core::analytics::chart_data;
    use pairs_trading_core::series::Series;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_export_writes_four_files() {
        let dates: Vec<NaiveDate> = (1..=6)
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
            .collect();
        let returns = Series::new(
            dates,
            vec![dec!(0), dec!(0.01), dec!(-0.02), dec!(0.005), dec!(0.02), dec!(-0.01)],
        )
        .unwrap();
        let charts = chart_data(&returns, 3, 252).unwrap();

        let dir = std::env::temp_dir().join(format!("pairs-charts-{}", std::process::id()));
        let written = export_charts(&dir, &charts).unwrap();
        assert_eq!(written.len(), 4);

        let cumulative = fs::read_to_string(dir.join("cumulative_returns.csv")).unwrap();
        let mut lines = cumulative.lines();
        assert_eq!(lines.next(), Some("date,cumulative_return"));
        assert_eq!(cumulative.lines().count(), 7);

        let drawdown = fs::read_to_string(dir.join("drawdown.csv")).unwrap();
        assert!(drawdown.starts_with("peak,valley,recovery,depth,duration"));

        let _ = fs::remove_dir_all(&dir);
    }
}
