use crate::error::DomainError;
use crate::math::rational::{bigint_to_u256, decimal_to_ratio, floor_to_u256, pow10, ratio_to_decimal, u256_to_bigint};
use num_bigint::BigInt;
use num_rational::BigRational;
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw on-chain token amount (smallest unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TokenAmount(pub U256);

impl TokenAmount {
    pub fn new(amount: impl Into<U256>) -> Self {
        Self(amount.into())
    }

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn to_bigint(&self) -> BigInt {
        u256_to_bigint(self.0)
    }

    pub fn from_bigint(value: &BigInt) -> Result<Self, DomainError> {
        bigint_to_u256(value).map(Self)
    }

    /// Converts whole units (e.g. `2.5` ETH) into raw units, rounding down.
    pub fn from_decimal(value: Decimal, decimals: u8) -> Result<Self, DomainError> {
        if value.is_sign_negative() {
            return Err(DomainError::AmountOverflow);
        }
        let raw = decimal_to_ratio(value) * BigRational::from_integer(pow10(decimals as u32));
        floor_to_u256(&raw).map(Self)
    }

    /// Human-readable amount with up to `decimals` places.
    pub fn to_decimal(&self, decimals: u8) -> Result<Decimal, DomainError> {
        let ratio = BigRational::new(self.to_bigint(), pow10(decimals as u32));
        ratio_to_decimal(&ratio, u32::from(decimals).min(18))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl From<u64> for TokenAmount {
    fn from(v: u64) -> Self {
        Self(U256::from(v))
    }
}

impl From<u128> for TokenAmount {
    fn from(v: u128) -> Self {
        Self(U256::from(v))
    }
}

impl From<U256> for TokenAmount {
    fn from(v: U256) -> Self {
        Self(v)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
