use crate::value_objects::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ERC-20 token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Pool ordering: the token with the lower address is token0.
    pub fn sorts_before(&self, other: &Token) -> bool {
        self.address < other.address
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
