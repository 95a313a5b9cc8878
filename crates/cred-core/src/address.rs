//! # Recipient Addresses
//!
//! Defines [`Address`], the 20-byte recipient identifier that every
//! eligibility list is made of.
//!
//! ## Normalization
//!
//! Accepted textual form: optional surrounding whitespace, an optional
//! `0x`/`0X` prefix, then exactly 40 hexadecimal digits in any case.
//! Anything else is rejected with [`DistributionError::InvalidAddress`]
//! before it can reach a hash function.
//!
//! The canonical rendering is `0x` followed by 40 lowercase hex digits.
//! `"0xABCD..."`, `"abcd..."` and `"  0xabcd...\n"` all parse to the same
//! bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DistributionError;

/// Width of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

const HEX_DIGITS: usize = ADDRESS_LEN * 2;

/// A normalized 20-byte recipient address.
///
/// Ordering is byte-wise, which is also the order of the lowercase hex
/// rendering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Parse an address from any accepted textual form.
    ///
    /// # Errors
    ///
    /// Returns [`DistributionError::InvalidAddress`] if the input is empty,
    /// has the wrong number of digits, or contains a non-hex character.
    pub fn parse(input: &str) -> Result<Self, DistributionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "address is empty"));
        }

        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if body.len() != HEX_DIGITS {
            return Err(invalid(
                input,
                &format!("expected {HEX_DIGITS} hex digits, found {}", body.len()),
            ));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|e| invalid(input, &format!("not hexadecimal: {e}")))?;
        Ok(Self(bytes))
    }

    /// Wrap raw address bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// The normalized byte sequence that gets hashed into a leaf.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Canonical rendering: `0x` + 40 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

fn invalid(input: &str, reason: &str) -> DistributionError {
    DistributionError::InvalidAddress {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

impl FromStr for Address {
    type Err = DistributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOWER: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

    #[test]
    fn parse_accepts_prefixed_lowercase() {
        let a = Address::parse(LOWER).unwrap();
        assert_eq!(a.to_hex(), LOWER);
    }

    #[test]
    fn textual_variants_normalize_to_same_bytes() {
        let variants = [
            "0x52908400098527886E0F7030069857D2E4169EE7",
            "52908400098527886e0f7030069857d2e4169ee7",
            "0X52908400098527886e0f7030069857d2e4169ee7",
            "  0x52908400098527886e0f7030069857d2e4169ee7\n",
            "\t52908400098527886E0F7030069857D2E4169EE7 ",
        ];
        let canonical = Address::parse(LOWER).unwrap();
        for v in variants {
            assert_eq!(Address::parse(v).unwrap(), canonical, "variant {v:?}");
        }
    }

    #[test]
    fn rejects_empty() {
        let err = Address::parse("   ").unwrap_err();
        assert_eq!(err.code(), "INVALID_ADDRESS");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse(&format!("{LOWER}00")).is_err());
        assert!(Address::parse("0x").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let err = Address::parse("0xg2908400098527886e0f7030069857d2e4169ee7").unwrap_err();
        match err {
            DistributionError::InvalidAddress { input, reason } => {
                assert!(input.starts_with("0xg"));
                assert!(reason.contains("hex"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_double_prefix() {
        assert!(Address::parse("0x0x52908400098527886e0f7030069857d2e416").is_err());
    }

    #[test]
    fn zero_address_parses_and_is_flagged() {
        let zero = Address::parse("0x0000000000000000000000000000000000000000").unwrap();
        assert!(zero.is_zero());
        assert!(!Address::parse(LOWER).unwrap().is_zero());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let a = Address::parse("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{LOWER}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn serde_rejects_malformed() {
        let result: Result<Address, _> = serde_json::from_str("\"0xnothex\"");
        assert!(result.is_err());
    }

    #[test]
    fn ordering_matches_hex_ordering() {
        let a = Address::from_bytes([0x01; ADDRESS_LEN]);
        let b = Address::from_bytes([0x02; ADDRESS_LEN]);
        assert!(a < b);
        assert!(a.to_hex() < b.to_hex());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_casing_normalizes_identically(bytes in proptest::array::uniform20(any::<u8>())) {
                let addr = Address::from_bytes(bytes);
                let lower = addr.to_hex();
                let upper = format!("0x{}", hex::encode_upper(bytes));
                prop_assert_eq!(Address::parse(&lower).unwrap(), addr);
                prop_assert_eq!(Address::parse(&upper).unwrap(), addr);
                prop_assert_eq!(Address::parse(&lower[2..]).unwrap(), addr);
            }
        }
    }
}
