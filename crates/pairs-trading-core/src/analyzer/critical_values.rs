use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::SignificanceLevel;
use crate::{PairsTradingError, PairsTradingResult};

/// Critical values at the three conventional confidence levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub ninety: Decimal,
    pub ninety_five: Decimal,
    pub ninety_nine: Decimal,
}

impl CriticalValues {
    const fn new(ninety: Decimal, ninety_five: Decimal, ninety_nine: Decimal) -> Self {
        Self {
            ninety,
            ninety_five,
            ninety_nine,
        }
    }

    pub fn at(&self, level: SignificanceLevel) -> Decimal {
        match level {
            SignificanceLevel::Ninety => self.ninety,
            SignificanceLevel::NinetyFive => self.ninety_five,
            SignificanceLevel::NinetyNine => self.ninety_nine,
        }
    }
}

// Rows are indexed by the number of common stochastic trends under the null
// (n - r), i.e. row 0 is one trend, row 1 two. Columns 90 / 95 / 99 %.

const TRACE_NO_DETERMINISTIC: [CriticalValues; 2] = [
    CriticalValues::new(dec!(2.9762), dec!(4.1296), dec!(6.9406)),
    CriticalValues::new(dec!(10.4741), dec!(12.3212), dec!(16.3640)),
];

const TRACE_CONSTANT: [CriticalValues; 2] = [
    CriticalValues::new(dec!(2.7055), dec!(3.8415), dec!(6.6349)),
    CriticalValues::new(dec!(13.4294), dec!(15.4943), dec!(19.9349)),
];

const TRACE_LINEAR_TREND: [CriticalValues; 2] = [
    CriticalValues::new(dec!(2.7055), dec!(3.8415), dec!(6.6349)),
    CriticalValues::new(dec!(16.1619), dec!(18.3985), dec!(23.1485)),
];

const MAX_EIGEN_NO_DETERMINISTIC: [CriticalValues; 2] = [
    CriticalValues::new(dec!(2.9762), dec!(4.1296), dec!(6.9406)),
    CriticalValues::new(dec!(9.4748), dec!(11.2246), dec!(15.0923)),
];

const MAX_EIGEN_CONSTANT: [CriticalValues; 2] = [
    CriticalValues::new(dec!(2.7055), dec!(3.8415), dec!(6.6349)),
    CriticalValues::new(dec!(12.2971), dec!(14.2639), dec!(18.5200)),
];

const MAX_EIGEN_LINEAR_TREND: [CriticalValues; 2] = [
    CriticalValues::new(dec!(2.7055), dec!(3.8415), dec!(6.6349)),
    CriticalValues::new(dec!(15.0006), dec!(17.1481), dec!(21.7465)),
];

fn lookup(
    table: &[CriticalValues; 2],
    trends: usize,
    det_order: i32,
) -> PairsTradingResult<CriticalValues> {
    if trends == 0 || trends > table.len() {
        return Err(PairsTradingError::InvalidInput {
            field: "trends".into(),
            reason: format!(
                "critical values are tabulated for 1..={} variables, got {} (det_order {})",
                table.len(),
                trends,
                det_order
            ),
        });
    }
    Ok(table[trends - 1])
}

/// Trace-test critical values for `trends` common trends under the null.
pub fn trace_critical_values(trends: usize, det_order: i32) -> PairsTradingResult<CriticalValues> {
    let table = match det_order {
        -1 => &TRACE_NO_DETERMINISTIC,
        0 => &TRACE_CONSTANT,
        1 => &TRACE_LINEAR_TREND,
        other => {
            return Err(PairsTradingError::InvalidInput {
                field: "det_order".into(),
                reason: format!("no critical values for det_order {}", other),
            })
        }
    };
    lookup(table, trends, det_order)
}

/// Maximum-eigenvalue-test critical values.
pub fn max_eigen_critical_values(
    trends: usize,
    det_order: i32,
) -> PairsTradingResult<CriticalValues> {
    let table = match det_order {
        -1 => &MAX_EIGEN_NO_DETERMINISTIC,
        0 => &MAX_EIGEN_CONSTANT,
        1 => &MAX_EIGEN_LINEAR_TREND,
        other => {
            return Err(PairsTradingError::InvalidInput {
                field: "det_order".into(),
                reason: format!("no critical values for det_order {}", other),
            })
        }
    };
    lookup(table, trends, det_order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_trace_values() {
        let two = trace_critical_values(2, 0).unwrap();
        assert_eq!(two.ninety_five, dec!(15.4943));
        let one = trace_critical_values(1, 0).unwrap();
        assert_eq!(one.ninety_five, dec!(3.8415));
        assert_eq!(one.at(SignificanceLevel::NinetyNine), dec!(6.6349));
    }

    #[test]
    fn test_max_eigen_values() {
        assert_eq!(
            max_eigen_critical_values(2, 0).unwrap().ninety_five,
            dec!(14.2639)
        );
        assert_eq!(
            max_eigen_critical_values(2, -1).unwrap().ninety,
            dec!(9.4748)
        );
    }

    #[test]
    fn test_out_of_table() {
        assert!(trace_critical_values(3, 0).is_err());
        assert!(trace_critical_values(0, 0).is_err());
        assert!(trace_critical_values(1, 2).is_err());
    }
}
