use crate::entities::token::Token;
use crate::error::DomainError;
use crate::fees::FeeTier;
use crate::math::rational::u256_to_bigint;
use crate::value_objects::{address::Address, price::Price};
use num_bigint::BigInt;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configured token pair, canonicalized so that `token0 < token1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairSpec {
    pub token0: Address,
    pub token1: Address,
    pub fee: FeeTier,
}

impl PairSpec {
    pub fn new(a: Address, b: Address, fee: FeeTier) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::InvalidPool(format!("pair uses {a} twice")));
        }
        let (token0, token1) = if a < b { (a, b) } else { (b, a) };
        Ok(Self {
            token0,
            token1,
            fee,
        })
    }

    /// True when the addresses (either order) and fee identify this pair.
    pub fn matches(&self, a: &Address, b: &Address, fee: u32) -> bool {
        let same_tokens = (self.token0 == *a && self.token1 == *b)
            || (self.token0 == *b && self.token1 == *a);
        same_tokens && self.fee.fee() == fee
    }
}

/// Parses `tokenA:tokenB:fee`.
impl FromStr for PairSpec {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [a, b, fee] = parts.as_slice() else {
            return Err(DomainError::InvalidPool(format!(
                "expected tokenA:tokenB:fee, got {s}"
            )));
        };
        let fee: u32 = fee
            .parse()
            .map_err(|_| DomainError::InvalidPool(format!("invalid fee {fee}")))?;
        Self::new(a.parse()?, b.parse()?, FeeTier::try_from(fee)?)
    }
}

impl fmt::Display for PairSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.token0, self.token1, self.fee)
    }
}

/// Snapshot of a Uniswap v3 pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    pub fee: FeeTier,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub liquidity: u128,
}

impl Pool {
    pub fn new(
        address: Address,
        token0: Token,
        token1: Token,
        fee: FeeTier,
        sqrt_price_x96: U256,
        tick: i32,
        liquidity: u128,
    ) -> Result<Self, DomainError> {
        if !token0.sorts_before(&token1) {
            return Err(DomainError::InvalidPool(format!(
                "token0 {} must sort before token1 {}",
                token0.address, token1.address
            )));
        }
        if sqrt_price_x96.is_zero() {
            return Err(DomainError::InvalidPool("pool is not initialized".to_string()));
        }
        Ok(Self {
            address,
            token0,
            token1,
            fee,
            sqrt_price_x96,
            tick,
            liquidity,
        })
    }

    pub fn tick_spacing(&self) -> i32 {
        self.fee.tick_spacing()
    }

    pub fn sqrt_price(&self) -> BigInt {
        u256_to_bigint(self.sqrt_price_x96)
    }

    /// Exact current price, raw token1 per raw token0.
    pub fn price(&self) -> Result<Price, DomainError> {
        Price::from_sqrt_price(&self.sqrt_price())
    }

    pub fn involves(&self, token: &Address) -> bool {
        self.token0.address == *token || self.token1.address == *token
    }

    /// Copy of the pool at another square root price and tick.
    #[must_use]
    pub fn with_price(&self, sqrt_price_x96: U256, tick: i32) -> Self {
        Self {
            sqrt_price_x96,
            tick,
            ..self.clone()
        }
    }
}
