use crate::errors::CurveError;
use crate::math::decimal::{self, Rounding, ToDecimal};
use alloy_primitives::U256;
use bigdecimal::BigDecimal;
use std::fmt;

/// Parses a human amount into its integer form with `decimals` fractional
/// digits. Digits beyond the coin's precision are dropped (rounded down), the
/// same way the contracts would truncate them.
pub fn parse_units<T: ToDecimal + ?Sized>(value: &T, decimals: u8) -> Result<U256, CurveError> {
    decimal::to_raw(&value.to_decimal()?, decimals, Rounding::Down)
}

/// Formats an integer amount as a decimal string with trailing zeros trimmed.
pub fn format_units(raw: U256, decimals: u8) -> String {
    format_digits(&raw.to_string(), decimals)
}

pub(crate) fn format_digits(digits: &str, decimals: u8) -> String {
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits.to_string();
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits.to_string()
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// An on-chain amount together with the decimal count of its coin.
///
/// The raw integer is the only stored representation; the decimal view is
/// always derived through [`format_units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Amount {
    raw: U256,
    decimals: u8,
}

impl Amount {
    pub const fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn parse<T: ToDecimal + ?Sized>(value: &T, decimals: u8) -> Result<Self, CurveError> {
        Ok(Self::from_raw(parse_units(value, decimals)?, decimals))
    }

    pub fn from_decimal(
        value: &BigDecimal,
        decimals: u8,
        rounding: Rounding,
    ) -> Result<Self, CurveError> {
        Ok(Self::from_raw(
            decimal::to_raw(value, decimals, rounding)?,
            decimals,
        ))
    }

    pub const fn raw(&self) -> U256 {
        self.raw
    }

    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    pub fn to_decimal(&self) -> BigDecimal {
        decimal::from_raw(self.raw, self.decimals)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.raw, self.decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_roundtrip() {
        for (input, decimals) in [
            ("0", 18),
            ("1", 18),
            ("1.5", 6),
            ("0.000001", 6),
            ("123456789.123456789012345678", 18),
            ("42", 0),
            ("0.00000001", 8),
        ] {
            let raw = parse_units(input, decimals).unwrap();
            assert_eq!(format_units(raw, decimals), input, "{input} @ {decimals}");
        }
    }

    #[test]
    fn trailing_zeros_are_trimmed() {
        let raw = parse_units("10.500", 6).unwrap();
        assert_eq!(raw, U256::from(10_500_000u64));
        assert_eq!(format_units(raw, 6), "10.5");
    }

    #[test]
    fn excess_precision_is_truncated() {
        assert_eq!(parse_units("1.0000019", 6).unwrap(), U256::from(1_000_001u64));
        assert_eq!(parse_units(&0.1f64, 2).unwrap(), U256::from(10u64));
    }

    #[test]
    fn rejects_garbage_and_negatives() {
        assert!(parse_units("abc", 18).is_err());
        assert!(parse_units("", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
    }

    #[test]
    fn amount_display_uses_coin_decimals() {
        let amount = Amount::parse("2.25", 8).unwrap();
        assert_eq!(amount.raw(), U256::from(225_000_000u64));
        assert_eq!(amount.to_string(), "2.25");
        assert_eq!(amount.to_decimal(), "2.25".to_decimal().unwrap());
    }
}
