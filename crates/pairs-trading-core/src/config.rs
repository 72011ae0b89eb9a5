use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{PairsTradingError, PairsTradingResult};

/// Rolling window for the spread z-score.
pub const DEFAULT_ZSCORE_WINDOW: usize = 30;

/// Rolling window for the chart-data Sharpe series (six trading months).
pub const DEFAULT_ROLLING_SHARPE_WINDOW: usize = 126;

pub const DEFAULT_TRADING_DAYS: u32 = 252;

/// Z-score bands driving the signal rule.
///
/// `|z| > entry` opens a position against the spread, `|z| <= exit` flattens,
/// anything in between keeps whatever position was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub entry: Decimal,
    pub exit: Decimal,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            entry: dec!(1.5),
            exit: dec!(0.5),
        }
    }
}

impl SignalThresholds {
    pub fn validate(&self) -> PairsTradingResult<()> {
        if self.exit < Decimal::ZERO {
            return Err(PairsTradingError::InvalidInput {
                field: "thresholds.exit".into(),
                reason: "Exit threshold must be non-negative".into(),
            });
        }
        if self.entry <= self.exit {
            return Err(PairsTradingError::InvalidInput {
                field: "thresholds.entry".into(),
                reason: "Entry threshold must exceed exit threshold".into(),
            });
        }
        Ok(())
    }
}

/// Johansen model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JohansenSpec {
    /// -1: no deterministic terms, 0: constant, 1: linear trend.
    pub det_order: i32,
    /// Number of lagged differences in the VECM.
    pub k_ar_diff: usize,
}

impl Default for JohansenSpec {
    fn default() -> Self {
        Self {
            det_order: 0,
            k_ar_diff: 1,
        }
    }
}

impl JohansenSpec {
    pub fn validate(&self) -> PairsTradingResult<()> {
        if !(-1..=1).contains(&self.det_order) {
            return Err(PairsTradingError::InvalidInput {
                field: "johansen.det_order".into(),
                reason: format!("det_order must be -1, 0 or 1, got {}", self.det_order),
            });
        }
        Ok(())
    }
}

/// Which critical-value column decides the verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceLevel {
    Ninety,
    #[default]
    NinetyFive,
    NinetyNine,
}

/// How the hedge ratio is estimated.
///
/// `FullSample` fits one regression over the whole history, so early spread
/// values depend on prices observed later. `Expanding` refits at every date
/// using only data up to that date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum HedgeRatioEstimation {
    #[default]
    FullSample,
    Expanding { min_periods: usize },
}

/// Every tunable of the analysis. All fields fall back to their defaults
/// when missing from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub zscore_window: usize,
    pub thresholds: SignalThresholds,
    pub johansen: JohansenSpec,
    pub significance: SignificanceLevel,
    pub hedge_ratio: HedgeRatioEstimation,
    pub trading_days_per_year: u32,
    pub rolling_sharpe_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            zscore_window: DEFAULT_ZSCORE_WINDOW,
            thresholds: SignalThresholds::default(),
            johansen: JohansenSpec::default(),
            significance: SignificanceLevel::default(),
            hedge_ratio: HedgeRatioEstimation::default(),
            trading_days_per_year: DEFAULT_TRADING_DAYS,
            rolling_sharpe_window: DEFAULT_ROLLING_SHARPE_WINDOW,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> PairsTradingResult<()> {
        if self.zscore_window < 2 {
            return Err(PairsTradingError::InvalidInput {
                field: "zscore_window".into(),
                reason: "Rolling window must be at least 2".into(),
            });
        }
        self.thresholds.validate()?;
        self.johansen.validate()?;
        if let HedgeRatioEstimation::Expanding { min_periods } = self.hedge_ratio {
            if min_periods < 2 {
                return Err(PairsTradingError::InvalidInput {
                    field: "hedge_ratio.min_periods".into(),
                    reason: "An expanding regression needs at least 2 observations".into(),
                });
            }
        }
        if self.trading_days_per_year == 0 {
            return Err(PairsTradingError::InvalidInput {
                field: "trading_days_per_year".into(),
                reason: "Must be positive".into(),
            });
        }
        if self.rolling_sharpe_window < 2 {
            return Err(PairsTradingError::InvalidInput {
                field: "rolling_sharpe_window".into(),
                reason: "Rolling window must be at least 2".into(),
            });
        }
        Ok(())
    }
}
