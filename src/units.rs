//! Exact integer amounts: decimal parsing, token-unit scaling and string serde.

use crate::error::{IncentiveError, Result};
use alloy_primitives::U256;

/// Fractional digits of the reward tokens handled here (wei-style units).
pub const TOKEN_DECIMALS: usize = 18;

/// Parses a non-negative base-10 integer without passing through floating point.
pub fn parse_amount(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IncentiveError::InvalidAmount(raw.to_string()));
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| IncentiveError::InvalidAmount(raw.to_string()))
}

/// Parses a decimal token amount (`"10"`, `"2.5"`) into base units with `decimals` digits.
///
/// More fractional digits than `decimals` is an error rather than a silent truncation.
pub fn parse_units(raw: &str, decimals: usize) -> Result<U256> {
    let trimmed = raw.trim();
    let (int, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if frac.len() > decimals || (int.is_empty() && frac.is_empty()) {
        return Err(IncentiveError::InvalidAmount(raw.to_string()));
    }
    if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(IncentiveError::InvalidAmount(raw.to_string()));
    }
    let mut digits = String::with_capacity(int.len() + decimals);
    digits.push_str(int);
    digits.push_str(frac);
    digits.extend(std::iter::repeat('0').take(decimals - frac.len()));
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| IncentiveError::InvalidAmount(raw.to_string()))
}

/// Serde adapter writing a [`U256`] as its exact decimal string.
pub mod decimal {
    use super::parse_amount;
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes as a decimal string.
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    /// Deserializes from a decimal string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_amount(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_amount, parse_units, TOKEN_DECIMALS};
    use alloy_primitives::U256;

    #[test]
    fn amounts_are_exact() {
        assert_eq!(parse_amount("0").unwrap(), U256::ZERO);
        let big = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(parse_amount(big).unwrap(), U256::MAX);
        assert!(parse_amount("115792089237316195423570985008687907853269984665640564039457584007913129639936").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("1e18").is_err());
    }

    #[test]
    fn units_scale_decimal_rewards() {
        let one = U256::from(1_000_000_000_000_000_000u64);
        assert_eq!(parse_units("10", TOKEN_DECIMALS).unwrap(), one * U256::from(10u64));
        assert_eq!(
            parse_units("2.5", TOKEN_DECIMALS).unwrap(),
            U256::from(2_500_000_000_000_000_000u64)
        );
        assert_eq!(parse_units("0.000000000000000001", TOKEN_DECIMALS).unwrap(), U256::from(1u64));
        assert_eq!(parse_units(".5", TOKEN_DECIMALS).unwrap(), one / U256::from(2u64));
        assert_eq!(parse_units("0", TOKEN_DECIMALS).unwrap(), U256::ZERO);
        assert!(parse_units("0.0000000000000000001", TOKEN_DECIMALS).is_err());
        assert!(parse_units("1,5", TOKEN_DECIMALS).is_err());
        assert!(parse_units(".", TOKEN_DECIMALS).is_err());
    }
}
