pub mod critical_values;
pub mod johansen;
pub mod spread;

pub use johansen::{cointegration_test, is_cointegrated, johansen, JohansenResult};
pub use spread::{analyze_spread, ols_hedge_ratio, spread_zscore, HedgeRegression, SpreadAnalysis};
