//! Decimal statistics and the small dense linear algebra the Johansen
//! procedure needs. Matrices here are at most a few columns wide, so a
//! row-major `Vec` with Gauss-Jordan inversion is plenty.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::{PairsTradingError, PairsTradingResult};

/// Pivots smaller than this are treated as zero.
const PIVOT_EPSILON: Decimal = dec!(0.000000000000000001);

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

pub(crate) fn mean(xs: &[Decimal]) -> Option<Decimal> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<Decimal>() / Decimal::from(xs.len() as i64))
}

/// Sample standard deviation (n - 1 denominator).
pub(crate) fn sample_std(xs: &[Decimal]) -> Option<Decimal> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let ss: Decimal = xs.iter().map(|x| (x - m) * (x - m)).sum();
    Some(sqrt_decimal(ss / Decimal::from((xs.len() - 1) as i64)))
}

/// Square root clamped at zero for non-positive input.
pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

/// Percentile with linear interpolation between closest ranks.
/// `pct` is in [0, 100].
pub(crate) fn percentile(xs: &[Decimal], pct: Decimal) -> Option<Decimal> {
    if xs.is_empty() {
        return None;
    }
    let mut sorted = xs.to_vec();
    sorted.sort();
    let rank = pct / dec!(100) * Decimal::from((sorted.len() - 1) as i64);
    let lower = rank.floor();
    let frac = rank - lower;
    let lo = lower.to_usize()?;
    let hi = (lo + 1).min(sorted.len() - 1);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Decimal>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Decimal::ZERO; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, Decimal::ONE);
        }
        m
    }

    /// Builds a matrix from equal-length columns.
    pub fn from_columns(columns: &[Vec<Decimal>]) -> Self {
        let cols = columns.len();
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut m = Self::zeros(rows, cols);
        for (j, column) in columns.iter().enumerate() {
            for (i, v) in column.iter().enumerate().take(rows) {
                m.set(i, j, *v);
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> Decimal {
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, v: Decimal) {
        self.data[r * self.cols + c] = v;
    }

    pub fn column(&self, c: usize) -> Vec<Decimal> {
        (0..self.rows).map(|r| self.get(r, c)).collect()
    }

    /// Rows `start..end`.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.rows);
        let start = start.min(end);
        Self {
            rows: end - start,
            cols: self.cols,
            data: self.data[start * self.cols..end * self.cols].to_vec(),
        }
    }

    /// Row-wise differences: `out[i] = self[i + 1] - self[i]`.
    pub fn diff(&self) -> Self {
        let rows = self.rows.saturating_sub(1);
        let mut out = Self::zeros(rows, self.cols);
        for i in 0..rows {
            for j in 0..self.cols {
                out.set(i, j, self.get(i + 1, j) - self.get(i, j));
            }
        }
        out
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(j, i, self.get(i, j));
            }
        }
        out
    }

    pub fn mul(&self, other: &Matrix) -> Self {
        debug_assert_eq!(self.cols, other.rows);
        let mut out = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a.is_zero() {
                    continue;
                }
                for j in 0..other.cols {
                    let cur = out.get(i, j);
                    out.set(i, j, cur + a * other.get(k, j));
                }
            }
        }
        out
    }

    /// `self' * other` without materialising the transpose.
    pub fn t_mul(&self, other: &Matrix) -> Self {
        debug_assert_eq!(self.rows, other.rows);
        let mut out = Self::zeros(self.cols, other.cols);
        for r in 0..self.rows {
            for i in 0..self.cols {
                let a = self.get(r, i);
                for j in 0..other.cols {
                    let cur = out.get(i, j);
                    out.set(i, j, cur + a * other.get(r, j));
                }
            }
        }
        out
    }

    pub fn sub(&self, other: &Matrix) -> Self {
        debug_assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a - b)
                .collect(),
        }
    }

    pub fn scale(&self, k: Decimal) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * k).collect(),
        }
    }

    /// Gauss-Jordan inverse with partial pivoting.
    pub fn inverse(&self, context: &str) -> PairsTradingResult<Self> {
        if self.rows != self.cols {
            return Err(PairsTradingError::InvalidInput {
                field: context.into(),
                reason: format!("cannot invert a {}x{} matrix", self.rows, self.cols),
            });
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Self::identity(n);

        for col in 0..n {
            let mut pivot_row = col;
            for r in (col + 1)..n {
                if a.get(r, col).abs() > a.get(pivot_row, col).abs() {
                    pivot_row = r;
                }
            }
            let pivot = a.get(pivot_row, col);
            if pivot.abs() < PIVOT_EPSILON {
                return Err(PairsTradingError::SingularMatrix {
                    context: context.into(),
                });
            }
            if pivot_row != col {
                a.swap_rows(pivot_row, col);
                inv.swap_rows(pivot_row, col);
            }
            for j in 0..n {
                a.set(col, j, a.get(col, j) / pivot);
                inv.set(col, j, inv.get(col, j) / pivot);
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a.get(r, col);
                if factor.is_zero() {
                    continue;
                }
                for j in 0..n {
                    a.set(r, j, a.get(r, j) - factor * a.get(col, j));
                    inv.set(r, j, inv.get(r, j) - factor * inv.get(col, j));
                }
            }
        }
        Ok(inv)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for j in 0..self.cols {
            self.data.swap(a * self.cols + j, b * self.cols + j);
        }
    }
}

/// Residuals of the least-squares projection of every column of `y` on `x`.
/// An empty regressor set leaves `y` untouched.
pub(crate) fn residualize(y: &Matrix, x: &Matrix, context: &str) -> PairsTradingResult<Matrix> {
    if x.cols() == 0 {
        return Ok(y.clone());
    }
    let xtx_inv = x.t_mul(x).inverse(context)?;
    let beta = xtx_inv.mul(&x.t_mul(y));
    Ok(y.sub(&x.mul(&beta)))
}

/// Removes a polynomial time trend of the given order from every column.
/// Order -1 is a no-op, 0 demeans, 1 removes a linear trend in
/// `linspace(-1, 1, rows)`.
pub(crate) fn detrend(y: &Matrix, order: i32, context: &str) -> PairsTradingResult<Matrix> {
    if order < 0 || y.rows() == 0 {
        return Ok(y.clone());
    }
    let n = y.rows();
    let mut regressors: Vec<Vec<Decimal>> = Vec::new();
    let grid: Vec<Decimal> = if n == 1 {
        vec![Decimal::ZERO]
    } else {
        let step = dec!(2) / Decimal::from((n - 1) as i64);
        (0..n)
            .map(|i| dec!(-1) + step * Decimal::from(i as i64))
            .collect()
    };
    for power in 0..=order {
        regressors.push(grid.iter().map(|t| t.powi(power as i64)).collect());
    }
    residualize(y, &Matrix::from_columns(&regressors), context)
}
