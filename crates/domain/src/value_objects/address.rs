use crate::error::DomainError;
use alloy_primitives::hex;
use primitive_types::H160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub H160);

impl Address {
    /// The zero address.
    #[must_use]
    pub fn zero() -> Self {
        Self(H160::zero())
    }

    /// Builds an address from exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DomainError> {
        if bytes.len() != 20 {
            return Err(DomainError::InvalidHex(format!(
                "expected 20 address bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(H160::from_slice(bytes)))
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// True for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Address {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bytes =
            hex::decode(trimmed).map_err(|_| DomainError::InvalidHex(trimmed.to_string()))?;
        Self::from_slice(&bytes).map_err(|_| DomainError::InvalidHex(trimmed.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(self.as_bytes()))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
