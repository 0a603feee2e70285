//! Merkle roots and publication records.
//!
//! `Root` is the 32-byte commitment shared between the commitment, publisher,
//! and service crates. `PublicationRecord` captures the last root the ledger
//! acknowledged, kept separate from whatever root is computed locally.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Root of an empty whitelist.
///
/// All-zero bytes; no proof can be built against it.
pub const EMPTY_ROOT: Root = Root([0u8; 32]);

/// A 32-byte Merkle root.
///
/// Serialized as a `0x`-prefixed lower-case hex string so that persisted
/// state and API payloads match what the ledger stores.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Root(pub [u8; 32]);

impl Root {
    /// Returns the raw root bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the empty-whitelist sentinel.
    pub fn is_empty(&self) -> bool {
        *self == EMPTY_ROOT
    }

    /// Hex encoding with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Root {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root({})", self.to_hex())
    }
}

impl FromStr for Root {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| CoreError::storage(format!("malformed root {s:?}: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::storage(format!("root {s:?} is not 32 bytes")))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Root {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Root> for String {
    fn from(root: Root) -> Self {
        root.to_hex()
    }
}

/// The last root the external ledger confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// Root acknowledged by the ledger.
    pub root: Root,
    /// Ledger-side confirmation identifier (transaction hash).
    pub confirmation_id: String,
    /// When the confirmation was received.
    pub confirmed_at: DateTime<Utc>,
}
