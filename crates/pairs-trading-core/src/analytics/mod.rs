pub mod drawdown;
pub mod perf_stats;

pub use drawdown::{chart_data, rolling_sharpe, top_drawdowns, underwater, ChartData, DrawdownPeriod};
pub use perf_stats::{
    max_drawdown, risk_summary, PerfStats, RiskAnalytics, RiskMetric, RiskStatistic, RiskSummary,
};
