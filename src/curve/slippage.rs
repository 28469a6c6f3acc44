use crate::errors::CurveError;
use crate::math::decimal::{self, Rounding};
use crate::math::{Amount, ToDecimal};
use bigdecimal::BigDecimal;
use num_traits::{Signed, Zero};
use std::fmt;

/// Maximum tolerated deviation, in percent (`0.5` is half a percent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlippageTolerance(BigDecimal);

impl SlippageTolerance {
    pub fn from_percent<T: ToDecimal + ?Sized>(percent: &T) -> Result<Self, CurveError> {
        let percent = percent.to_decimal()?;
        if percent.is_negative() || percent >= BigDecimal::from(100) {
            return Err(CurveError::InvalidAmount(
                decimal::plain_string(&percent, 18),
                "slippage tolerance must be in [0, 100)".to_string(),
            ));
        }
        Ok(Self(percent))
    }

    pub fn from_bps(bps: u32) -> Result<Self, CurveError> {
        Self::from_percent(&(BigDecimal::from(bps) / BigDecimal::from(100)))
    }

    pub fn percent(&self) -> &BigDecimal {
        &self.0
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self(BigDecimal::new(5.into(), 1))
    }
}

impl fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", decimal::plain_string(&self.0, 18))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundDirection {
    MinReceived,
    MaxBurn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlippageBound {
    pub expected: Amount,
    pub tolerance: SlippageTolerance,
    pub bound: Amount,
    pub direction: BoundDirection,
}

/// `expected * (100 - t) / 100`, rounded down.
pub fn min_received(expected: Amount, tolerance: &SlippageTolerance) -> Result<SlippageBound, CurveError> {
    let value = decimal::scale_by_percent(&expected.to_decimal(), &-tolerance.percent().clone());
    Ok(SlippageBound {
        expected,
        tolerance: tolerance.clone(),
        bound: Amount::from_decimal(&value, expected.decimals(), Rounding::Down)?,
        direction: BoundDirection::MinReceived,
    })
}

/// `expected * (100 + t) / 100`, rounded up.
pub fn max_burn(expected: Amount, tolerance: &SlippageTolerance) -> Result<SlippageBound, CurveError> {
    let value = decimal::scale_by_percent(&expected.to_decimal(), tolerance.percent());
    Ok(SlippageBound {
        expected,
        tolerance: tolerance.clone(),
        bound: Amount::from_decimal(&value, expected.decimals(), Rounding::Up)?,
        direction: BoundDirection::MaxBurn,
    })
}

/// Bonus in percent when more is better: LP minted by a deposit, or value
/// received by a single-coin withdrawal, against the balanced counterfactual.
pub fn bonus_on_received(actual: &BigDecimal, balanced: &BigDecimal) -> Result<BigDecimal, CurveError> {
    decimal::percent_change(actual, balanced)
}

/// Bonus in percent when less is better: LP burned by an imbalanced
/// withdrawal against a balanced withdrawal of the same value.
pub fn bonus_on_burned(actual: &BigDecimal, balanced: &BigDecimal) -> Result<BigDecimal, CurveError> {
    decimal::percent_change(balanced, actual)
}

/// Price impact of a swap, in percent, against the rate of a small trade.
/// Never negative.
pub fn price_impact(
    small_in: &BigDecimal,
    small_out: &BigDecimal,
    amount_in: &BigDecimal,
    amount_out: &BigDecimal,
) -> Result<BigDecimal, CurveError> {
    let small_rate = decimal::ratio(small_out, small_in)?;
    let rate = decimal::ratio(amount_out, amount_in)?;
    let impact = -decimal::percent_change(&rate, &small_rate)?;
    Ok(if impact.is_negative() { BigDecimal::zero() } else { impact })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn bounds_bracket_the_expected_amount() {
        let tolerance = SlippageTolerance::from_percent("0.5").unwrap();
        for raw in [1u64, 7, 999, 1_000_000, 123_456_789_012] {
            let expected = Amount::from_raw(U256::from(raw), 6);
            let min = min_received(expected, &tolerance).unwrap();
            let max = max_burn(expected, &tolerance).unwrap();
            assert!(min.bound.raw() <= expected.raw());
            assert!(expected.raw() <= max.bound.raw());
        }
    }

    #[test]
    fn bounds_round_in_the_users_favour() {
        let tolerance = SlippageTolerance::from_percent("1").unwrap();
        let expected = Amount::from_raw(U256::from(1_001u64), 6);
        assert_eq!(min_received(expected, &tolerance).unwrap().bound.raw(), U256::from(990u64));
        assert_eq!(max_burn(expected, &tolerance).unwrap().bound.raw(), U256::from(1_012u64));
    }

    #[test]
    fn tolerance_validation() {
        assert!(SlippageTolerance::from_percent("100").is_err());
        assert!(SlippageTolerance::from_percent("-0.1").is_err());
        assert_eq!(SlippageTolerance::from_bps(50).unwrap(), SlippageTolerance::default());
        assert_eq!(SlippageTolerance::default().to_string(), "0.5%");
    }

    #[test]
    fn bonus_signs() {
        assert_eq!(bonus_on_received(&dec("101"), &dec("100")).unwrap(), dec("1"));
        assert_eq!(bonus_on_burned(&dec("99"), &dec("100")).unwrap().round(6), dec("1.010101"));
    }

    #[test]
    fn price_impact_against_small_trade() {
        let impact = price_impact(&dec("1"), &dec("0.999"), &dec("1000"), &dec("989.01")).unwrap();
        assert_eq!(impact, dec("1"));
        let none = price_impact(&dec("1"), &dec("0.99"), &dec("10"), &dec("9.95")).unwrap();
        assert_eq!(none, dec("0"));
    }
}
