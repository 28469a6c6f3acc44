use crate::errors::CurveError;
use alloy_primitives::U256;
use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};
use std::str::FromStr;

/// Direction used when a decimal value is truncated to a fixed number of
/// fractional digits. All values handled here are non-negative, so `Down`
/// is a floor and `Up` is a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

impl From<Rounding> for RoundingMode {
    fn from(rounding: Rounding) -> Self {
        match rounding {
            Rounding::Down => RoundingMode::Down,
            Rounding::Up => RoundingMode::Up,
        }
    }
}

/// Anything a caller may pass as a human amount: decimal strings, integers or
/// floats. Floats go through their shortest round-trip string form, so `0.1`
/// is read as exactly one tenth.
pub trait ToDecimal {
    fn to_decimal(&self) -> Result<BigDecimal, CurveError>;
}

impl ToDecimal for str {
    fn to_decimal(&self) -> Result<BigDecimal, CurveError> {
        let trimmed = self.trim();
        if trimmed.is_empty() {
            return Err(CurveError::InvalidAmount(
                self.to_string(),
                "empty string".to_string(),
            ));
        }
        BigDecimal::from_str(trimmed)
            .map_err(|e| CurveError::InvalidAmount(self.to_string(), e.to_string()))
    }
}

impl ToDecimal for String {
    fn to_decimal(&self) -> Result<BigDecimal, CurveError> {
        self.as_str().to_decimal()
    }
}

impl ToDecimal for f64 {
    fn to_decimal(&self) -> Result<BigDecimal, CurveError> {
        if !self.is_finite() {
            return Err(CurveError::InvalidAmount(
                self.to_string(),
                "not a finite number".to_string(),
            ));
        }
        self.to_string().as_str().to_decimal()
    }
}

impl ToDecimal for u64 {
    fn to_decimal(&self) -> Result<BigDecimal, CurveError> {
        Ok(BigDecimal::from(*self))
    }
}

impl ToDecimal for BigDecimal {
    fn to_decimal(&self) -> Result<BigDecimal, CurveError> {
        Ok(self.clone())
    }
}

impl<T: ToDecimal + ?Sized> ToDecimal for &T {
    fn to_decimal(&self) -> Result<BigDecimal, CurveError> {
        (**self).to_decimal()
    }
}

pub fn to_bigint(value: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>())
}

pub fn to_u256(value: &BigInt) -> Result<U256, CurveError> {
    if value.is_negative() || value.bits() > 256 {
        return Err(CurveError::CalculationError(
            "BigInt to U256 conversion overflow".into(),
        ));
    }
    let (_, bytes) = value.to_bytes_be();
    Ok(U256::from_be_slice(&bytes))
}

/// Interprets `raw` as a fixed-point number with `decimals` fractional digits.
pub fn from_raw(raw: U256, decimals: u8) -> BigDecimal {
    BigDecimal::new(to_bigint(raw), i64::from(decimals))
}

/// Converts a non-negative decimal into its fixed-point integer form.
pub fn to_raw(value: &BigDecimal, decimals: u8, rounding: Rounding) -> Result<U256, CurveError> {
    if value.is_negative() {
        return Err(CurveError::InvalidAmount(
            plain_string(value, 18),
            "amount must not be negative".to_string(),
        ));
    }
    let scaled = value.with_scale_round(i64::from(decimals), rounding.into());
    let (digits, scale) = scaled.as_bigint_and_exponent();
    debug_assert_eq!(scale, i64::from(decimals));
    to_u256(&digits).map_err(|_| {
        CurveError::InvalidAmount(
            plain_string(value, decimals),
            "amount does not fit into 256 bits".to_string(),
        )
    })
}

/// Renders `value` without exponent notation, truncated to at most `scale`
/// fractional digits, trailing zeros removed.
pub fn plain_string(value: &BigDecimal, scale: u8) -> String {
    let negative = value.is_negative();
    let truncated = value
        .abs()
        .with_scale_round(i64::from(scale), RoundingMode::Down);
    let (digits, _) = truncated.as_bigint_and_exponent();
    let body = super::fixed_point::format_digits(&digits.to_string(), scale);
    if negative && body != "0" {
        format!("-{body}")
    } else {
        body
    }
}

/// `numerator / denominator`, failing on a zero denominator.
pub fn ratio(numerator: &BigDecimal, denominator: &BigDecimal) -> Result<BigDecimal, CurveError> {
    if denominator.is_zero() {
        return Err(CurveError::CalculationError("ratio with zero denominator".into()));
    }
    Ok(numerator / denominator)
}

/// Relative change of `value` against `base`, in percent.
pub fn percent_change(value: &BigDecimal, base: &BigDecimal) -> Result<BigDecimal, CurveError> {
    Ok(ratio(&(value - base), base)? * BigDecimal::from(100))
}

/// `value * (100 + delta_percent) / 100`. A negative delta shrinks the value.
pub fn scale_by_percent(value: &BigDecimal, delta_percent: &BigDecimal) -> BigDecimal {
    value * (BigDecimal::from(100) + delta_percent) / BigDecimal::from(100)
}

pub fn sum<'a>(values: impl IntoIterator<Item = &'a BigDecimal>) -> BigDecimal {
    values
        .into_iter()
        .fold(BigDecimal::zero(), |acc, v| acc + v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn floats_are_read_through_their_shortest_form() {
        assert_eq!(0.1f64.to_decimal().unwrap(), dec("0.1"));
        assert_eq!(1234.5f64.to_decimal().unwrap(), dec("1234.5"));
        assert!(f64::NAN.to_decimal().is_err());
    }

    #[test]
    fn to_raw_respects_rounding_direction() {
        let value = dec("1.0000005");
        assert_eq!(to_raw(&value, 6, Rounding::Down).unwrap(), U256::from(1_000_000));
        assert_eq!(to_raw(&value, 6, Rounding::Up).unwrap(), U256::from(1_000_001));
        assert!(to_raw(&dec("-1"), 6, Rounding::Down).is_err());
    }

    #[test]
    fn bigint_roundtrip_at_the_edges() {
        assert_eq!(to_u256(&to_bigint(U256::MAX)).unwrap(), U256::MAX);
        assert_eq!(to_u256(&to_bigint(U256::ZERO)).unwrap(), U256::ZERO);
        assert!(to_u256(&(to_bigint(U256::MAX) + 1)).is_err());
        assert!(to_u256(&BigInt::from(-1)).is_err());
    }

    #[test]
    fn plain_string_never_uses_exponents() {
        assert_eq!(plain_string(&dec("1e-7"), 18), "0.0000001");
        assert_eq!(plain_string(&dec("12e3"), 2), "12000");
        assert_eq!(plain_string(&dec("-0.25"), 18), "-0.25");
    }

    #[test]
    fn percent_change_is_relative_to_base() {
        assert_eq!(percent_change(&dec("101"), &dec("100")).unwrap(), dec("1"));
        assert_eq!(percent_change(&dec("99"), &dec("100")).unwrap(), dec("-1"));
        assert!(percent_change(&dec("1"), &dec("0")).is_err());
    }
}
