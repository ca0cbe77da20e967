//! On-chain quantities handed to the engine: stake balances and accounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places of the native token.
pub const TOKEN_DECIMALS: u32 = 18;

/// Base units per whole token (`10^18`).
pub const BASE_UNITS_PER_TOKEN: u128 = 10u128.pow(TOKEN_DECIMALS);

/// Errors raised while parsing a [`StakeAmount`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")]
    /// Input was empty.
    Empty,
    #[error("invalid amount {0:?}")]
    /// Input was not a decimal or `0x` hex integer.
    Invalid(String),
    #[error("amount exceeds 128 bits")]
    /// Value does not fit the base-unit representation.
    Overflow,
}

/// A token balance in base units (18-decimal fixed point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct StakeAmount(u128);

impl StakeAmount {
    /// No stake.
    pub const ZERO: StakeAmount = StakeAmount(0);

    /// Wraps a raw base-unit value.
    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    /// Builds an amount from whole tokens; `None` on overflow.
    pub fn from_tokens(tokens: u64) -> Option<Self> {
        (tokens as u128).checked_mul(BASE_UNITS_PER_TOKEN).map(Self)
    }

    /// Raw base-unit value.
    pub const fn base_units(&self) -> u128 {
        self.0
    }

    /// Returns true for a zero balance.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whole-token count as a float.
    ///
    /// Precision is lost beyond 53 bits of mantissa; the quota formula
    /// accepts that approximation.
    pub fn tokens(&self) -> f64 {
        self.0 as f64 / BASE_UNITS_PER_TOKEN as f64
    }

    /// Token count with thousands separators and at most two fraction digits.
    pub fn display_tokens(&self) -> String {
        format_grouped(self.tokens(), 2)
    }

    /// Parses a decimal integer or a `0x`-prefixed hex quantity.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(AmountError::Empty);
        }
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some("") => return Err(AmountError::Invalid(raw.to_string())),
            Some(hex) => u128::from_str_radix(hex, 16),
            None => raw.parse::<u128>(),
        };
        parsed.map(Self).map_err(|err| match err.kind() {
            std::num::IntErrorKind::PosOverflow => AmountError::Overflow,
            _ => AmountError::Invalid(raw.to_string()),
        })
    }
}

impl fmt::Display for StakeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StakeAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<StakeAmount> for String {
    fn from(amount: StakeAmount) -> Self {
        amount.0.to_string()
    }
}

impl TryFrom<String> for StakeAmount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Formats `value` with `,` grouping and up to `max_fraction` digits,
/// dropping trailing fractional zeros.
pub fn format_grouped(value: f64, max_fraction: usize) -> String {
    let fixed = format!("{:.*}", max_fraction, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

/// Errors raised while parsing an [`Address`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be 0x-prefixed")]
    /// Missing `0x` prefix.
    MissingPrefix,
    #[error("address must be 20 bytes, got {0}")]
    /// Wrong decoded length.
    Length(usize),
    #[error("address hex decode failed: {0}")]
    /// Non-hex characters.
    Hex(String),
}

/// A 20-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address, used as the "no wallet" placeholder.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true for the placeholder address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// `0x1234...abcd` form, or `Not connected` for the zero address.
    pub fn short(&self) -> String {
        if self.is_zero() {
            return "Not connected".to_string();
        }
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let body = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        let bytes = hex::decode(body).map_err(|err| AddressError::Hex(err.to_string()))?;
        let bytes: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::Length(bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex_amounts() {
        assert_eq!(
            StakeAmount::parse("1000000000000000000"),
            Ok(StakeAmount::from_base_units(BASE_UNITS_PER_TOKEN))
        );
        assert_eq!(
            StakeAmount::parse("0xde0b6b3a7640000"),
            Ok(StakeAmount::from_base_units(BASE_UNITS_PER_TOKEN))
        );
        assert_eq!(StakeAmount::parse(" "), Err(AmountError::Empty));
        assert_eq!(
            StakeAmount::parse("0x"),
            Err(AmountError::Invalid("0x".into()))
        );
        assert_eq!(
            StakeAmount::parse("12.5"),
            Err(AmountError::Invalid("12.5".into()))
        );
        assert_eq!(
            StakeAmount::parse("340282366920938463463374607431768211456"),
            Err(AmountError::Overflow)
        );
    }

    #[test]
    fn token_conversion_and_display() {
        let stake = StakeAmount::from_tokens(1_234_567).unwrap();
        assert_eq!(stake.tokens(), 1_234_567.0);
        assert_eq!(stake.display_tokens(), "1,234,567");
        let half = StakeAmount::from_base_units(BASE_UNITS_PER_TOKEN / 2);
        assert_eq!(half.display_tokens(), "0.5");
        assert!(StakeAmount::ZERO.is_zero());
        assert_eq!(StakeAmount::ZERO.tokens(), 0.0);
    }

    #[test]
    fn grouping_handles_small_and_negative_values() {
        assert_eq!(format_grouped(0.0, 2), "0");
        assert_eq!(format_grouped(999.456, 2), "999.46");
        assert_eq!(format_grouped(1000.0, 0), "1,000");
        assert_eq!(format_grouped(-1234.5, 1), "-1,234.5");
    }

    #[test]
    fn amount_serializes_as_decimal_string() {
        let stake = StakeAmount::from_base_units(u128::MAX);
        let json = serde_json::to_string(&stake).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        let back: StakeAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stake);
    }

    #[test]
    fn address_parsing_and_short_form() {
        let addr: Address = "0x9D6Aa03a8D4AcF7b43c562f349Ee45b3214c3bbF".parse().unwrap();
        assert_eq!(
            addr.to_string(),
            "0x9d6aa03a8d4acf7b43c562f349ee45b3214c3bbf"
        );
        assert_eq!(addr.short(), "0x9d6a...3bbf");
        assert_eq!(Address::ZERO.short(), "Not connected");
        assert_eq!(
            "9d6aa03a8d4acf7b43c562f349ee45b3214c3bbf".parse::<Address>(),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!("0x1234".parse::<Address>(), Err(AddressError::Length(2)));
        assert!(matches!("0xzz".parse::<Address>(), Err(AddressError::Hex(_))));
    }
}
