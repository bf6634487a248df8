//! Balance equalization before opening a position.
//!
//! Values are compared in token0 units at the pool price. A flat reserve of
//! the native token is withheld from trading so the wallet keeps gas money.

use crate::entities::pool::Pool;
use crate::enums::{SwapDirection, TradeKind};
use crate::error::DomainError;
use crate::math::rational::{ceil_to_u256, floor_to_u256, u256_to_ratio};
use crate::value_objects::address::Address;
use num_rational::BigRational;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Amount of the native token that is never traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeReserve {
    /// Wrapped native token address (WETH on mainnet).
    pub token: Address,
    /// Raw amount withheld.
    pub amount: U256,
}

impl NativeReserve {
    pub fn new(token: Address, amount: U256) -> Self {
        Self { token, amount }
    }

    /// Balances of `pool.token0` and `pool.token1` with the reserve removed.
    pub fn spendable(&self, pool: &Pool, balance0: U256, balance1: U256) -> (U256, U256) {
        if pool.token0.address == self.token {
            (balance0.saturating_sub(self.amount), balance1)
        } else if pool.token1.address == self.token {
            (balance0, balance1.saturating_sub(self.amount))
        } else {
            (balance0, balance1)
        }
    }
}

/// Swap that brings both balances to equal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub direction: SwapDirection,
    pub buy_token: Address,
    pub sell_token: Address,
    /// Zero means no swap is needed.
    pub buy_amount: U256,
    pub sell_amount: U256,
}

impl SplitPlan {
    /// The "nothing to do" plan for a pool.
    pub fn none(pool: &Pool) -> Self {
        Self {
            direction: SwapDirection::ZeroForOne,
            buy_token: pool.token1.address,
            sell_token: pool.token0.address,
            buy_amount: U256::zero(),
            sell_amount: U256::zero(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.buy_amount.is_zero()
    }

    /// Exact input when token0 is sold, exact output when token0 is bought.
    pub fn trade_kind(&self) -> TradeKind {
        match self.direction {
            SwapDirection::ZeroForOne => TradeKind::ExactInput,
            SwapDirection::OneForZero => TradeKind::ExactOutput,
        }
    }
}

/// Sizes the swap for raw balances of `pool.token0` and `pool.token1`.
pub fn plan(
    balance0: U256,
    balance1: U256,
    pool: &Pool,
    reserve: &NativeReserve,
) -> Result<SplitPlan, DomainError> {
    let (spendable0, spendable1) = reserve.spendable(pool, balance0, balance1);
    let price = pool.price()?;
    let price = price.as_ratio();

    let b0 = u256_to_ratio(spendable0);
    let b1 = u256_to_ratio(spendable1);
    let target = (&b0 + &b1 / price) / BigRational::from_integer(2.into());

    if b0 > target {
        let sell_amount = floor_to_u256(&(&b0 - &target))?;
        let buy_amount = floor_to_u256(&(u256_to_ratio(sell_amount) * price))?;
        if sell_amount.is_zero() || buy_amount.is_zero() {
            return Ok(SplitPlan::none(pool));
        }
        Ok(SplitPlan {
            direction: SwapDirection::ZeroForOne,
            buy_token: pool.token1.address,
            sell_token: pool.token0.address,
            buy_amount,
            sell_amount,
        })
    } else {
        let buy_amount = floor_to_u256(&(&target - &b0))?;
        if buy_amount.is_zero() {
            return Ok(SplitPlan::none(pool));
        }
        let sell_amount = ceil_to_u256(&(u256_to_ratio(buy_amount) * price))?;
        Ok(SplitPlan {
            direction: SwapDirection::OneForZero,
            buy_token: pool.token0.address,
            sell_token: pool.token1.address,
            buy_amount,
            sell_amount,
        })
    }
}

/// Total value of both balances, in token0 and in token1 raw units.
pub fn wallet_value(
    balance0: U256,
    balance1: U256,
    pool: &Pool,
) -> Result<(BigRational, BigRational), DomainError> {
    let price = pool.price()?;
    let price = price.as_ratio();
    let in_token0 = u256_to_ratio(balance0) + u256_to_ratio(balance1) / price;
    let in_token1 = &in_token0 * price;
    Ok((in_token0, in_token1))
}

/// Equalizer bound to a reserve policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceEqualizer {
    reserve: NativeReserve,
}

impl BalanceEqualizer {
    /// Creates a new equalizer withholding `reserve`.
    pub fn new(reserve: NativeReserve) -> Self {
        Self { reserve }
    }

    pub fn reserve(&self) -> &NativeReserve {
        &self.reserve
    }

    pub fn plan(&self, balance0: U256, balance1: U256, pool: &Pool) -> Result<SplitPlan, DomainError> {
        plan(balance0, balance1, pool, &self.reserve)
    }
}
