use chrono::NaiveDate;
use pairs_trading_core::data::PriceProvider;
use pairs_trading_core::series::{PricePoint, PriceSeries};
use pairs_trading_core::{PairsTradingError, PairsTradingResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    close: Decimal,
}

/// Reads `<dir>/<INSTRUMENT>.csv` files with `date,close` columns.
#[derive(Debug, Clone)]
pub struct CsvPriceProvider {
    dir: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, instrument: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", instrument))
    }
}

impl PriceProvider for CsvPriceProvider {
    fn history(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PairsTradingResult<PriceSeries> {
        let path = self.path_for(instrument);
        let unavailable =
            |e: csv::Error| PairsTradingError::DataUnavailable(format!("{}: {}", path.display(), e));

        let mut reader = csv::Reader::from_path(&path).map_err(unavailable)?;
        let mut points = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(unavailable)?;
            if row.date >= start && row.date <= end {
                points.push(PricePoint {
                    date: row.date,
                    close: row.close,
                });
            }
        }
        points.sort_by_key(|p| p.date);
        debug!(instrument, rows = points.len(), path = %path.display(), "csv prices loaded");
        Ok(PriceSeries::new(instrument, points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::fs;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_reads_and_filters_rows() {
        let dir = std::env::temp_dir().join(format!("pairs-csv-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("XOM.csv"),
            "date,close\n2024-03-04,101.5\n2024-03-01,100\n2024-03-05,99.25\n2024-03-08,98\n",
        )
        .unwrap();

        let provider = CsvPriceProvider::new(&dir);
        let series = provider.history("XOM", d(1), d(5)).unwrap();
        assert_eq!(series.dates(), vec![d(1), d(4), d(5)]);
        assert_eq!(series.closes(), vec![dec!(100), dec!(101.5), dec!(99.25)]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let provider = CsvPriceProvider::new("/nonexistent-price-dir");
        assert!(matches!(
            provider.history("XOM", d(1), d(5)),
            Err(PairsTradingError::DataUnavailable(_))
        ));
    }
}
