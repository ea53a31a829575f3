//! Exact conversion between display amounts and base units

use crate::constants::NATIVE_DECIMALS;
use crate::error::ClientError;
use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::U256;
use std::fmt;
use std::str::FromStr;

/// A native-currency quantity, stored as an integer number of base units (wei)
///
/// Parsing and formatting are exact: a decimal string with at most 18 fractional
/// digits converts to base units and back without rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonetaryAmount(U256);

impl MonetaryAmount {
    /// The zero amount
    pub const ZERO: Self = Self(U256::ZERO);

    /// Wrap a raw base-unit value as returned by the contract
    pub const fn from_base_units(value: U256) -> Self {
        Self(value)
    }

    /// The base-unit integer the contract stores
    pub const fn base_units(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<U256> for MonetaryAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<MonetaryAmount> for U256 {
    fn from(amount: MonetaryAmount) -> Self {
        amount.0
    }
}

impl FromStr for MonetaryAmount {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| ClientError::InvalidAmount(format!("{s:?}: {why}"));

        let trimmed = s.trim();
        let (int, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        if int.is_empty() && frac.is_empty() {
            return Err(invalid("empty amount"));
        }
        if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected an unsigned decimal number"));
        }
        if frac.len() > NATIVE_DECIMALS as usize {
            return Err(invalid("more than 18 fractional digits"));
        }

        // Canonical `<int>.<frac>` form so leading/trailing dots parse the same way
        let int = if int.is_empty() { "0" } else { int };
        let frac = if frac.is_empty() { "0" } else { frac };
        let wei = parse_ether(&format!("{int}.{frac}")).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self(wei))
    }
}

impl fmt::Display for MonetaryAmount {
    /// Shortest exact decimal form, always with a fractional part (`"0.0"`, `"0.001"`, `"12.5"`)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let padded = format_ether(self.0);
        match padded.split_once('.') {
            Some((int, frac)) => {
                let frac = frac.trim_end_matches('0');
                if frac.is_empty() {
                    write!(f, "{int}.0")
                } else {
                    write!(f, "{int}.{frac}")
                }
            }
            None => write!(f, "{padded}.0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(s: &str) -> U256 {
        U256::from_str_radix(s, 10).unwrap()
    }

    #[test]
    fn test_parse_milli_ether() {
        let amount: MonetaryAmount = "0.001".parse().unwrap();
        assert_eq!(amount.base_units(), wei("1000000000000000"));
        assert_eq!(amount.to_string(), "0.001");
    }

    #[test]
    fn test_round_trip_keeps_value() {
        for s in ["0.01", "1", "12.5", "0.000000000000000001", "123456789.123456789123456789"] {
            let amount: MonetaryAmount = s.parse().unwrap();
            let again: MonetaryAmount = amount.to_string().parse().unwrap();
            assert_eq!(amount, again, "{s}");
        }
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(MonetaryAmount::ZERO.to_string(), "0.0");
        assert_eq!(MonetaryAmount::from_base_units(wei("1000000000000000000")).to_string(), "1.0");
        assert_eq!(MonetaryAmount::from_base_units(U256::from(1u64)).to_string(), "0.000000000000000001");
        assert_eq!(MonetaryAmount::from_base_units(wei("12500000000000000000")).to_string(), "12.5");
    }

    #[test]
    fn test_dot_forms() {
        let a: MonetaryAmount = ".5".parse().unwrap();
        let b: MonetaryAmount = "0.5".parse().unwrap();
        let c: MonetaryAmount = "2.".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(c.base_units(), wei("2000000000000000000"));
    }

    #[test]
    fn test_rejects_inexact_or_malformed() {
        for s in ["", ".", "-1", "+1", "1e18", "abc", "1.2.3", "0.0000000000000000001"] {
            assert!(
                matches!(s.parse::<MonetaryAmount>(), Err(ClientError::InvalidAmount(_))),
                "{s:?} should be rejected"
            );
        }
    }
}
