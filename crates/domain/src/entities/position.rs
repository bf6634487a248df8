use crate::entities::pool::Pool;
use crate::error::DomainError;
use crate::math::concentrated_liquidity::get_amounts_for_liquidity;
use crate::math::price_tick::{sqrt_ratio_at_tick, tick_to_price};
use crate::value_objects::price::Price;
use crate::value_objects::price_range::{TickRange, in_range};
use num_bigint::BigInt;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Position NFT token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub U256);

impl From<u64> for PositionId {
    fn from(v: u64) -> Self {
        Self(U256::from(v))
    }
}

impl FromStr for PositionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_dec_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::InvalidHex(format!("invalid position id {s}")))
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A liquidity position on a shared pool snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub pool: Arc<Pool>,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    /// `None` until minted.
    pub id: Option<PositionId>,
}

impl Position {
    /// Validates that the ticks form a band aligned to the pool spacing.
    pub fn new(
        pool: Arc<Pool>,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        id: Option<PositionId>,
    ) -> Result<Self, DomainError> {
        let ticks = TickRange::new(tick_lower, tick_upper)?;
        let spacing = pool.tick_spacing();
        if !ticks.is_aligned(spacing) {
            return Err(DomainError::InvalidRange(format!(
                "ticks {tick_lower}..{tick_upper} are not multiples of spacing {spacing}"
            )));
        }
        Ok(Self {
            pool,
            tick_lower,
            tick_upper,
            liquidity,
            id,
        })
    }

    pub fn ticks(&self) -> TickRange {
        TickRange {
            tick_lower: self.tick_lower,
            tick_upper: self.tick_upper,
        }
    }
}

pub fn lower_price(position: &Position) -> Result<Price, DomainError> {
    tick_to_price(position.tick_lower)
}

pub fn upper_price(position: &Position) -> Result<Price, DomainError> {
    tick_to_price(position.tick_upper)
}

/// Whether the pool price lies strictly inside the position band.
pub fn is_in_range(position: &Position) -> Result<bool, DomainError> {
    let current = position.pool.price()?;
    Ok(in_range(&current, &lower_price(position)?, &upper_price(position)?))
}

/// Token amounts the position holds at the pool's current price.
pub fn token_amounts(position: &Position) -> Result<(BigInt, BigInt), DomainError> {
    get_amounts_for_liquidity(
        &position.pool.sqrt_price(),
        &sqrt_ratio_at_tick(position.tick_lower)?,
        &sqrt_ratio_at_tick(position.tick_upper)?,
        position.liquidity,
    )
}
