//! Shared primitive types.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A 20-byte contract or wallet address.
///
/// Entity ids derive from addresses, so the canonical lowercase-hex spelling
/// matters: two spellings of one address must map to the same document key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let mut buf = [0u8; 20];
        if bytes.len() != buf.len() {
            return None;
        }
        buf.copy_from_slice(bytes);
        Some(Address(buf))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Error, Debug)]
#[error("invalid address: {0}")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| AddressParseError(s.to_string()))?;
        Address::from_slice(&bytes).ok_or_else(|| AddressParseError(s.to_string()))
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
        s.parse().map_err(de::Error::custom)
    }
}

/// Ordering and provenance shared by every decoded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Contract that emitted the event.
    pub contract: Address,
    pub block_number: u64,
    pub timestamp: i64,
    pub tx_hash: String,
    pub log_index: u64,
    /// Transaction origin; the acting user for attribution purposes.
    pub tx_from: Address,
}

impl EventContext {
    /// Canonical stream position, used for order sanity logging only.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}
