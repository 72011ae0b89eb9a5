use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::series::{PricePair, PriceSeries};
use crate::types::InstrumentPair;
use crate::{PairsTradingError, PairsTradingResult};

/// Source of daily closing prices.
pub trait PriceProvider {
    /// Closes for `instrument` dated within `start..=end`, oldest first.
    fn history(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PairsTradingResult<PriceSeries>;
}

/// Provider backed by series held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, mut series: PriceSeries) {
        series.points.sort_by_key(|p| p.date);
        self.series.insert(series.instrument.clone(), series);
    }
}

impl PriceProvider for InMemoryProvider {
    fn history(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PairsTradingResult<PriceSeries> {
        let series = self.series.get(instrument).ok_or_else(|| {
            PairsTradingError::DataUnavailable(format!("unknown instrument {}", instrument))
        })?;
        let points = series
            .points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();
        Ok(PriceSeries::new(instrument, points))
    }
}

/// First and last calendar date of a trailing lookback ending at `as_of`.
pub fn lookback_window(
    lookback_days: u32,
    as_of: NaiveDate,
) -> PairsTradingResult<(NaiveDate, NaiveDate)> {
    if lookback_days == 0 {
        return Err(PairsTradingError::InvalidInput {
            field: "lookback_days".into(),
            reason: "Lookback must be at least one day".into(),
        });
    }
    let start = as_of
        .checked_sub_signed(Duration::days(i64::from(lookback_days)))
        .ok_or_else(|| {
            PairsTradingError::DateError(format!(
                "{} days before {} is out of range",
                lookback_days, as_of
            ))
        })?;
    Ok((start, as_of))
}

/// Fetch aligned closing prices for both instruments over the trailing
/// `lookback_days` ending at `as_of`.
pub fn pull<P: PriceProvider + ?Sized>(
    provider: &P,
    instruments: &InstrumentPair,
    lookback_days: u32,
    as_of: NaiveDate,
) -> PairsTradingResult<PricePair> {
    let (start, end) = lookback_window(lookback_days, as_of)?;
    debug!(%start, %end, first = %instruments.first, second = %instruments.second, "pulling prices");

    let first = provider.history(&instruments.first, start, end)?;
    let second = provider.history(&instruments.second, start, end)?;
    let pair = PricePair::new(first, second)?;

    info!(
        observations = pair.len(),
        first = %instruments.first,
        second = %instruments.second,
        "price history aligned"
    );
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PricePoint;
    use rust_decimal::Decimal;

    fn daily(name: &str, start: NaiveDate, n: i64, skip: Option<i64>) -> PriceSeries {
        let points = (0..n)
            .filter(|i| Some(*i) != skip)
            .map(|i| PricePoint {
                date: start + Duration::days(i),
                close: Decimal::from(100 + i),
            })
            .collect();
        PriceSeries::new(name, points)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_pull_filters_to_window() {
        let start = d(2024, 1, 1);
        let provider = InMemoryProvider::new()
            .with_series(daily("HD", start, 60, None))
            .with_series(daily("LOW", start, 60, None));
        let pair = pull(
            &provider,
            &InstrumentPair::new("HD", "LOW"),
            10,
            d(2024, 2, 15),
        )
        .unwrap();
        assert_eq!(pair.len(), 11);
        assert_eq!(pair.dates()[0], d(2024, 2, 5));
        assert_eq!(pair.instruments(), InstrumentPair::new("HD", "LOW"));
    }

    #[test]
    fn test_unknown_instrument() {
        let provider = InMemoryProvider::new().with_series(daily("HD", d(2024, 1, 1), 5, None));
        let err = pull(&provider, &InstrumentPair::new("HD", "XYZ"), 30, d(2024, 1, 5))
            .unwrap_err();
        assert!(matches!(err, PairsTradingError::DataUnavailable(_)));
    }

    #[test]
    fn test_empty_window_is_unavailable() {
        let provider = InMemoryProvider::new()
            .with_series(daily("A", d(2020, 1, 1), 5, None))
            .with_series(daily("B", d(2020, 1, 1), 5, None));
        let err = pull(&provider, &InstrumentPair::new("A", "B"), 30, d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, PairsTradingError::DataUnavailable(_)));
    }

    #[test]
    fn test_gap_is_hard_failure() {
        let start = d(2024, 1, 1);
        let provider = InMemoryProvider::new()
            .with_series(daily("A", start, 20, None))
            .with_series(daily("B", start, 20, Some(7)));
        let err = pull(&provider, &InstrumentPair::new("A", "B"), 30, d(2024, 1, 20)).unwrap_err();
        assert!(matches!(err, PairsTradingError::DataUnavailable(_)));
    }

    #[test]
    fn test_zero_lookback_rejected() {
        assert!(matches!(
            lookback_window(0, d(2024, 1, 1)),
            Err(PairsTradingError::InvalidInput { .. })
        ));
    }
}
