pub mod engine;
pub mod signals;

pub use engine::{backtest, cumulative_returns, run_backtest, BacktestPeriod, BacktestReport};
pub use signals::{
    classify, generate_signals, lag_positions, resolve_positions, Position, PositionSeries,
    Signal, SignalSeries,
};
