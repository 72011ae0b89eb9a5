use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SignalThresholds;
use crate::series::{Series, ZScoreSeries};

/// Exposure to the spread (long instrument one, short instrument two for
/// `Long`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn value(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }
}

impl From<Position> for Decimal {
    fn from(p: Position) -> Self {
        Decimal::from(p.value())
    }
}

/// Output of the threshold rule for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Move to this position
    Target(Position),
    /// Keep whatever was held in the previous period
    Hold,
}

pub type SignalSeries = Series<Signal>;

pub type PositionSeries = Series<Position>;

/// Stateless threshold rule. Undefined z-scores hold.
pub fn classify(z: Option<Decimal>, thresholds: &SignalThresholds) -> Signal {
    let Some(z) = z else {
        return Signal::Hold;
    };
    if z > thresholds.entry {
        Signal::Target(Position::Short)
    } else if z < -thresholds.entry {
        Signal::Target(Position::Long)
    } else if z >= -thresholds.exit && z <= thresholds.exit {
        Signal::Target(Position::Flat)
    } else {
        Signal::Hold
    }
}

pub fn generate_signals(zscores: &ZScoreSeries, thresholds: &SignalThresholds) -> SignalSeries {
    zscores.map(|z| classify(*z, thresholds))
}

/// Replaces every `Hold` with the position resolved one period earlier.
///
/// Strictly sequential: each step reads the previous step's output. A hold
/// on the first period resolves to `Flat`.
pub fn resolve_positions(signals: &SignalSeries) -> PositionSeries {
    let mut last = Position::Flat;
    let mut resolved = Vec::with_capacity(signals.len());
    for signal in signals.values() {
        if let Signal::Target(p) = signal {
            last = *p;
        }
        resolved.push(last);
    }
    signals.with_values(resolved)
}

/// Positions shifted one period later: the exposure actually carried into
/// each period's return. The first period has none.
pub fn lag_positions(positions: &PositionSeries) -> Series<Option<Position>> {
    let values: Vec<Option<Position>> = std::iter::once(None)
        .chain(positions.values().iter().copied().map(Some))
        .take(positions.len())
        .collect();
    positions.with_values(values)
}
