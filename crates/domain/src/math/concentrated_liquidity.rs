//! Token amounts and liquidity over a tick range, in Q64.96 fixed point.
//!
//! All functions take square root prices as produced by
//! [`sqrt_ratio_at_tick`](crate::math::price_tick::sqrt_ratio_at_tick) and
//! round the way the periphery `LiquidityAmounts` library does (down).

use crate::error::DomainError;
use crate::math::price_tick::q96;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

fn ordered<'a>(a: &'a BigInt, b: &'a BigInt) -> Result<(&'a BigInt, &'a BigInt), DomainError> {
    if !a.is_positive() || !b.is_positive() {
        return Err(DomainError::InvalidPrice(
            "sqrt price must be positive".to_string(),
        ));
    }
    Ok(if a < b { (a, b) } else { (b, a) })
}

fn to_liquidity(value: BigInt) -> Result<u128, DomainError> {
    value.to_u128().ok_or(DomainError::AmountOverflow)
}

/// Amount of token0 held by `liquidity` between two square root prices.
/// delta_x = L * 2^96 * (sqrt_b - sqrt_a) / sqrt_b / sqrt_a
pub fn get_amount0_delta(
    liquidity: u128,
    sqrt_price_a: &BigInt,
    sqrt_price_b: &BigInt,
) -> Result<BigInt, DomainError> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    let numerator = (BigInt::from(liquidity) << 96) * (upper - lower);
    Ok(numerator / upper / lower)
}

/// Amount of token1 held by `liquidity` between two square root prices.
/// delta_y = L * (sqrt_b - sqrt_a) / 2^96
pub fn get_amount1_delta(
    liquidity: u128,
    sqrt_price_a: &BigInt,
    sqrt_price_b: &BigInt,
) -> Result<BigInt, DomainError> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    Ok(BigInt::from(liquidity) * (upper - lower) / q96())
}

/// Liquidity obtainable from `amount0` of token0 over the range.
pub fn get_liquidity_for_amount0(
    amount0: &BigInt,
    sqrt_price_a: &BigInt,
    sqrt_price_b: &BigInt,
) -> Result<u128, DomainError> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    if lower == upper {
        return Err(DomainError::InvalidRange("empty range".to_string()));
    }
    let intermediate = lower * upper / q96();
    to_liquidity(amount0 * intermediate / (upper - lower))
}

/// Liquidity obtainable from `amount1` of token1 over the range.
pub fn get_liquidity_for_amount1(
    amount1: &BigInt,
    sqrt_price_a: &BigInt,
    sqrt_price_b: &BigInt,
) -> Result<u128, DomainError> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    if lower == upper {
        return Err(DomainError::InvalidRange("empty range".to_string()));
    }
    to_liquidity((amount1 << 96) / (upper - lower))
}

/// Maximum liquidity that both amounts can back at the current price.
pub fn get_max_liquidity_for_amounts(
    sqrt_price_current: &BigInt,
    sqrt_price_a: &BigInt,
    sqrt_price_b: &BigInt,
    amount0: &BigInt,
    amount1: &BigInt,
) -> Result<u128, DomainError> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    if sqrt_price_current <= lower {
        get_liquidity_for_amount0(amount0, lower, upper)
    } else if sqrt_price_current < upper {
        let liquidity0 = get_liquidity_for_amount0(amount0, sqrt_price_current, upper)?;
        let liquidity1 = get_liquidity_for_amount1(amount1, lower, sqrt_price_current)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        get_liquidity_for_amount1(amount1, lower, upper)
    }
}

/// Token amounts represented by `liquidity` at the current price.
pub fn get_amounts_for_liquidity(
    sqrt_price_current: &BigInt,
    sqrt_price_a: &BigInt,
    sqrt_price_b: &BigInt,
    liquidity: u128,
) -> Result<(BigInt, BigInt), DomainError> {
    let (lower, upper) = ordered(sqrt_price_a, sqrt_price_b)?;
    if sqrt_price_current <= lower {
        Ok((get_amount0_delta(liquidity, lower, upper)?, BigInt::zero()))
    } else if sqrt_price_current < upper {
        Ok((
            get_amount0_delta(liquidity, sqrt_price_current, upper)?,
            get_amount1_delta(liquidity, lower, sqrt_price_current)?,
        ))
    } else {
        Ok((BigInt::zero(), get_amount1_delta(liquidity, lower, upper)?))
    }
}
