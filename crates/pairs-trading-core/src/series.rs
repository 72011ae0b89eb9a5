use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{InstrumentPair, Price, Rate};
use crate::{PairsTradingError, PairsTradingResult};

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Price,
}

/// Closing-price history for one instrument, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub instrument: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(instrument: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            instrument: instrument.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn closes(&self) -> Vec<Price> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Simple period returns; undefined for the first observation.
    pub fn simple_returns(&self) -> Vec<Option<Rate>> {
        let mut out = Vec::with_capacity(self.points.len());
        for (i, point) in self.points.iter().enumerate() {
            if i == 0 {
                out.push(None);
                continue;
            }
            let prev = self.points[i - 1].close;
            if prev.is_zero() {
                out.push(None);
            } else {
                out.push(Some(point.close / prev - Decimal::ONE));
            }
        }
        out
    }

    fn check_dates_increasing(&self) -> PairsTradingResult<()> {
        for w in self.points.windows(2) {
            if w[1].date <= w[0].date {
                return Err(PairsTradingError::InvalidInput {
                    field: format!("{}.points", self.instrument),
                    reason: format!(
                        "dates must be strictly increasing ({} follows {})",
                        w[1].date, w[0].date
                    ),
                });
            }
        }
        Ok(())
    }

    fn check_positive(&self) -> PairsTradingResult<()> {
        if let Some(p) = self.points.iter().find(|p| p.close <= Decimal::ZERO) {
            return Err(PairsTradingError::InvalidInput {
                field: format!("{}.points", self.instrument),
                reason: format!("close on {} must be positive, got {}", p.date, p.close),
            });
        }
        Ok(())
    }
}

/// Two price series sharing an identical date index.
///
/// Construction is the only way in, so every `PricePair` is non-empty,
/// strictly increasing in time, aligned and strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedPricePair")]
pub struct PricePair {
    first: PriceSeries,
    second: PriceSeries,
}

#[derive(Deserialize)]
struct UncheckedPricePair {
    first: PriceSeries,
    second: PriceSeries,
}

impl TryFrom<UncheckedPricePair> for PricePair {
    type Error = PairsTradingError;

    fn try_from(raw: UncheckedPricePair) -> Result<Self, Self::Error> {
        PricePair::new(raw.first, raw.second)
    }
}

impl PricePair {
    pub fn new(first: PriceSeries, second: PriceSeries) -> PairsTradingResult<Self> {
        for series in [&first, &second] {
            if series.is_empty() {
                return Err(PairsTradingError::DataUnavailable(format!(
                    "no price data for {}",
                    series.instrument
                )));
            }
            series.check_dates_increasing()?;
            series.check_positive()?;
        }

        if first.len() != second.len()
            || first
                .points
                .iter()
                .zip(second.points.iter())
                .any(|(a, b)| a.date != b.date)
        {
            let missing = count_unshared_dates(&first, &second);
            return Err(PairsTradingError::DataUnavailable(format!(
                "{} and {} cannot be aligned: {} dates are not shared by both series",
                first.instrument, second.instrument, missing
            )));
        }

        Ok(Self { first, second })
    }

    pub fn first(&self) -> &PriceSeries {
        &self.first
    }

    pub fn second(&self) -> &PriceSeries {
        &self.second
    }

    pub fn instruments(&self) -> InstrumentPair {
        InstrumentPair::new(&self.first.instrument, &self.second.instrument)
    }

    pub fn len(&self) -> usize {
        self.first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.first.dates()
    }

    /// Natural-log closes for both legs. Prices are positive by construction.
    pub fn log_prices(&self) -> (Vec<Decimal>, Vec<Decimal>) {
        use rust_decimal::MathematicalOps;
        let ln = |s: &PriceSeries| -> Vec<Decimal> {
            s.points.iter().map(|p| p.close.ln()).collect()
        };
        (ln(&self.first), ln(&self.second))
    }
}

fn count_unshared_dates(a: &PriceSeries, b: &PriceSeries) -> usize {
    use std::collections::BTreeSet;
    let da: BTreeSet<NaiveDate> = a.points.iter().map(|p| p.date).collect();
    let db: BTreeSet<NaiveDate> = b.points.iter().map(|p| p.date).collect();
    da.symmetric_difference(&db).count()
}

// ---------------------------------------------------------------------------
// Derived series
// ---------------------------------------------------------------------------

/// Values keyed by date, one per index position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedSeries<T>")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Series<T> {
    dates: Vec<NaiveDate>,
    values: Vec<T>,
}

#[derive(Deserialize)]
struct UncheckedSeries<T> {
    dates: Vec<NaiveDate>,
    values: Vec<T>,
}

impl<T> TryFrom<UncheckedSeries<T>> for Series<T> {
    type Error = PairsTradingError;

    fn try_from(raw: UncheckedSeries<T>) -> Result<Self, Self::Error> {
        Series::new(raw.dates, raw.values)
    }
}

impl<T> Series<T> {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<T>) -> PairsTradingResult<Self> {
        if dates.len() != values.len() {
            return Err(PairsTradingError::Alignment(format!(
                "series has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        Ok(Self { dates, values })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &T)> {
        self.dates.iter().zip(self.values.iter())
    }

    pub fn shares_index_with<U>(&self, other: &Series<U>) -> bool {
        self.dates == other.dates
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Series<U> {
        Series {
            dates: self.dates.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Same index, new values. Callers derive `values` one-to-one from this
    /// series.
    pub(crate) fn with_values<U>(&self, values: Vec<U>) -> Series<U> {
        debug_assert_eq!(values.len(), self.dates.len());
        Series {
            dates: self.dates.clone(),
            values,
        }
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

/// ln(second) - b * ln(first); undefined where no hedge ratio is available.
pub type SpreadSeries = Series<Option<Decimal>>;

/// Rolling z-score of the spread; undefined for the warm-up window.
pub type ZScoreSeries = Series<Option<Decimal>>;

/// Per-period strategy returns with missing values already zero-filled.
pub type StrategyReturnSeries = Series<Rate>;
