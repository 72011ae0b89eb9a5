use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::critical_values::{max_eigen_critical_values, trace_critical_values, CriticalValues};
use crate::config::{JohansenSpec, SignificanceLevel};
use crate::math::{detrend, residualize, sqrt_decimal, Matrix};
use crate::series::PricePair;
use crate::{PairsTradingError, PairsTradingResult};

/// Variables in the system: always the two legs of the pair.
const NEQS: usize = 2;

/// Each leg is rebased to this value at its first close. The statistics are
/// invariant to per-leg scaling; rebasing keeps the moment products of very
/// cheap or very expensive instruments inside Decimal's significant digits.
const REBASE_LEVEL: Decimal = dec!(100);

/// Full output of the Johansen procedure for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JohansenResult {
    /// Squared canonical correlations, descending
    pub eigenvalues: Vec<Decimal>,
    /// Trace statistics for H0: rank <= r, r = 0, 1
    pub trace_statistics: Vec<Decimal>,
    /// Maximum-eigenvalue statistics for H0: rank = r vs r + 1
    pub max_eigen_statistics: Vec<Decimal>,
    /// Trace critical values, one row per r
    pub trace_critical_values: Vec<CriticalValues>,
    /// Maximum-eigenvalue critical values, one row per r
    pub max_eigen_critical_values: Vec<CriticalValues>,
    /// Observations left after differencing and lagging
    pub effective_observations: usize,
    pub det_order: i32,
    pub k_ar_diff: usize,
}

impl JohansenResult {
    /// Trace critical values at one confidence level, paired with
    /// `trace_statistics`.
    pub fn critical_values_at(&self, level: SignificanceLevel) -> Vec<Decimal> {
        self.trace_critical_values.iter().map(|c| c.at(level)).collect()
    }

    pub fn is_cointegrated(&self, level: SignificanceLevel) -> bool {
        is_cointegrated(&self.trace_statistics, &self.critical_values_at(level))
    }

    /// Sequential trace-test rank: the number of leading hypotheses rejected
    /// before the first one that is not.
    pub fn rank(&self, level: SignificanceLevel) -> usize {
        self.trace_statistics
            .iter()
            .zip(self.critical_values_at(level))
            .take_while(|(stat, cv)| **stat > *cv)
            .count()
    }
}

/// Cointegration is accepted when any trace statistic exceeds its paired
/// critical value.
pub fn is_cointegrated(trace_statistics: &[Decimal], critical_values: &[Decimal]) -> bool {
    trace_statistics
        .iter()
        .zip(critical_values.iter())
        .any(|(stat, cv)| stat > cv)
}

/// Trace statistics and their 95% critical values.
pub fn cointegration_test(
    prices: &PricePair,
    spec: &JohansenSpec,
) -> PairsTradingResult<(Vec<Decimal>, Vec<Decimal>)> {
    let result = johansen(prices, spec)?;
    let critical = result.critical_values_at(SignificanceLevel::NinetyFive);
    Ok((result.trace_statistics, critical))
}

/// Johansen cointegration test on the closing price levels of a pair.
pub fn johansen(prices: &PricePair, spec: &JohansenSpec) -> PairsTradingResult<JohansenResult> {
    spec.validate()?;
    let nobs = prices.len();
    let k = spec.k_ar_diff;
    let required = (k + 1) * NEQS + k + 3;
    if nobs < required {
        return Err(PairsTradingError::InsufficientHistory {
            required,
            actual: nobs,
        });
    }

    let levels = Matrix::from_columns(&[
        rebased(&prices.first().closes()),
        rebased(&prices.second().closes()),
    ]);
    let levels = detrend(&levels, spec.det_order, "johansen level detrending")?;

    // Auxiliary regressions only carry a constant once any deterministic
    // term is in the model.
    let aux_order = if spec.det_order > -1 { 0 } else { -1 };

    let dx = levels.diff();
    let z = detrend(&lagged_differences(&dx, k), aux_order, "lagged differences")?;

    let dx_now = detrend(&dx.slice_rows(k, dx.rows()), aux_order, "differences")?;
    let r0t = residualize(&dx_now, &z, "differences on lagged differences")?;

    let lagged_levels = detrend(&levels.slice_rows(1, nobs - k), aux_order, "lagged levels")?;
    let rkt = residualize(&lagged_levels, &z, "levels on lagged differences")?;

    let t = rkt.rows();
    let inv_t = Decimal::ONE / Decimal::from(t as i64);
    let skk = rkt.t_mul(&rkt).scale(inv_t);
    let sk0 = rkt.t_mul(&r0t).scale(inv_t);
    let s00 = r0t.t_mul(&r0t).scale(inv_t);

    let sig = sk0.mul(&s00.inverse("S00 moment matrix")?).mul(&sk0.transpose());
    let m = skk.inverse("Skk moment matrix")?.mul(&sig);

    let eigenvalues = sorted_eigenvalues(&m)?;
    debug!(?eigenvalues, effective_observations = t, "johansen eigenvalues");

    let t_dec = Decimal::from(t as i64);
    let log_complements: Vec<Decimal> = eigenvalues
        .iter()
        .map(|a| (Decimal::ONE - a).ln())
        .collect();

    let mut trace_statistics = Vec::with_capacity(NEQS);
    let mut max_eigen_statistics = Vec::with_capacity(NEQS);
    let mut trace_cvs = Vec::with_capacity(NEQS);
    let mut max_eigen_cvs = Vec::with_capacity(NEQS);
    for i in 0..NEQS {
        let tail: Decimal = log_complements[i..].iter().copied().sum();
        trace_statistics.push(-t_dec * tail);
        max_eigen_statistics.push(-t_dec * log_complements[i]);
        trace_cvs.push(trace_critical_values(NEQS - i, spec.det_order)?);
        max_eigen_cvs.push(max_eigen_critical_values(NEQS - i, spec.det_order)?);
    }

    Ok(JohansenResult {
        eigenvalues,
        trace_statistics,
        max_eigen_statistics,
        trace_critical_values: trace_cvs,
        max_eigen_critical_values: max_eigen_cvs,
        effective_observations: t,
        det_order: spec.det_order,
        k_ar_diff: k,
    })
}

/// Closes divided by the first close, times [`REBASE_LEVEL`]. Closes are
/// positive by construction.
fn rebased(closes: &[Decimal]) -> Vec<Decimal> {
    let base = closes.first().copied().unwrap_or(Decimal::ONE);
    closes.iter().map(|c| *c / base * REBASE_LEVEL).collect()
}

/// Row `i` holds `dx[i + k - 1], ..., dx[i]`: the `k` differences preceding
/// time `i + k`, newest lag first.
fn lagged_differences(dx: &Matrix, k: usize) -> Matrix {
    let rows = dx.rows().saturating_sub(k);
    let mut z = Matrix::zeros(rows, k * dx.cols());
    for i in 0..rows {
        let t = i + k;
        for lag in 1..=k {
            for j in 0..dx.cols() {
                z.set(i, (lag - 1) * dx.cols() + j, dx.get(t - lag, j));
            }
        }
    }
    z
}

/// Eigenvalues of a 2x2 matrix, descending, clamped to [0, 1).
fn sorted_eigenvalues(m: &Matrix) -> PairsTradingResult<Vec<Decimal>> {
    let (a, b, c, d) = (m.get(0, 0), m.get(0, 1), m.get(1, 0), m.get(1, 1));
    let half_trace = (a + d) / dec!(2);
    let det = a * d - b * c;
    // Real by construction; tiny negative discriminants are rounding.
    let root = sqrt_decimal(half_trace * half_trace - det);

    let mut out = Vec::with_capacity(NEQS);
    for lambda in [half_trace + root, half_trace - root] {
        if lambda >= Decimal::ONE {
            return Err(PairsTradingError::SingularMatrix {
                context: "johansen eigenvalue of one: the series are perfectly collinear".into(),
            });
        }
        out.push(lambda.max(Decimal::ZERO));
    }
    Ok(out)
}
