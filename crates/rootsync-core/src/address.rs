//! Canonical whitelist addresses.
//!
//! Addresses arrive as case-insensitive hex strings. They are normalized to a
//! single canonical form (`0x` followed by lower-case digits) on parse, and
//! only the canonical form is ever compared, stored, or hashed. A single case
//! mismatch would otherwise yield a different leaf hash for the same logical
//! address.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Maximum address length in bytes.
pub const MAX_ADDRESS_BYTES: usize = 32;

/// A whitelisted account identifier in canonical form.
///
/// Construction always goes through [`Address::parse`], so holding an
/// `Address` guarantees it is well-formed and normalized. Leading zero bytes
/// are significant: `0x00aa` and `0xaa` are different addresses.
///
/// # Example
///
/// ```
/// use rootsync_core::Address;
///
/// let upper = Address::parse("0xAbCd").unwrap();
/// let lower = Address::parse("abcd").unwrap();
/// assert_eq!(upper, lower);
/// assert_eq!(upper.as_str(), "0xabcd");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parses and canonicalizes an address.
    ///
    /// Accepts an optional `0x`/`0X` prefix followed by an even number of hex
    /// digits, at most [`MAX_ADDRESS_BYTES`] bytes long.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidAddress` for empty input, odd digit counts,
    /// non-hex characters, or over-long input.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(CoreError::invalid_address(input, "no hex digits"));
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(CoreError::invalid_address(
                input,
                format!("contains non-hex character {bad:?}"),
            ));
        }
        if digits.len() % 2 != 0 {
            return Err(CoreError::invalid_address(input, "odd number of hex digits"));
        }
        if digits.len() / 2 > MAX_ADDRESS_BYTES {
            return Err(CoreError::invalid_address(
                input,
                format!("longer than {MAX_ADDRESS_BYTES} bytes"),
            ));
        }

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the decoded address bytes used for leaf hashing.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Canonical form is validated hex, decoding cannot fail.
        hex::decode(&self.0[2..]).unwrap_or_default()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
