//! Record written after every position (re)open.

use crate::entities::pool::Pool;
use crate::equalizer::wallet_value;
use crate::error::DomainError;
use crate::math::price_tick::tick_to_price;
use crate::math::rational::{pow10, ratio_to_decimal_fitting};
use crate::value_objects::{address::Address, price_range::TickRange};
use num_rational::BigRational;
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places kept for band prices.
pub const PRICE_SCALE: u32 = 10;

/// Wallet value and band at the moment a position was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionHistoryEntry {
    /// Wallet value in whole units of the native token.
    pub total_wallet_value_native: Decimal,
    /// Wallet value in whole units of the other pool token.
    pub total_wallet_value_token: Decimal,
    /// Human price of token0 in token1 at `tick_lower`.
    pub lower_price: Decimal,
    /// Human price of token0 in token1 at `tick_upper`.
    pub upper_price: Decimal,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl PositionHistoryEntry {
    /// Builds an entry from the balances backing a freshly minted band.
    ///
    /// If neither pool token is `native`, token0 is reported as the native side.
    pub fn from_balances(
        pool: &Pool,
        balance0: U256,
        balance1: U256,
        ticks: &TickRange,
        native: &Address,
        timestamp: i64,
    ) -> Result<Self, DomainError> {
        let (value0, value1) = wallet_value(balance0, balance1, pool)?;
        let human0 = to_human(&value0, pool.token0.decimals)?;
        let human1 = to_human(&value1, pool.token1.decimals)?;
        let (native_value, token_value) = if pool.token1.address == *native {
            (human1, human0)
        } else {
            (human0, human1)
        };

        let (d0, d1) = (pool.token0.decimals, pool.token1.decimals);
        Ok(Self {
            total_wallet_value_native: native_value,
            total_wallet_value_token: token_value,
            lower_price: tick_to_price(ticks.tick_lower)?.to_decimal(d0, d1, PRICE_SCALE)?,
            upper_price: tick_to_price(ticks.tick_upper)?.to_decimal(d0, d1, PRICE_SCALE)?,
            timestamp,
        })
    }
}

/// Whole token units, keeping as many of the token's decimals as fit.
fn to_human(raw: &BigRational, decimals: u8) -> Result<Decimal, DomainError> {
    let scaled = raw / BigRational::from_integer(pow10(u32::from(decimals)));
    ratio_to_decimal_fitting(&scaled, u32::from(decimals).min(18))
}
