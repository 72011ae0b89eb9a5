pub mod analyzer;
pub mod backtester;
pub mod config;
pub mod data;
pub mod error;
pub mod series;
pub mod types;

mod math;

#[cfg(feature = "analytics")]
pub mod analytics;

#[cfg(feature = "analytics")]
pub mod pipeline;

pub use error::PairsTradingError;
pub use types::*;

/// Standard result type for all pairs-trading operations
pub type PairsTradingResult<T> = Result<T, PairsTradingError>;
