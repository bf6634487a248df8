//! Tick ↔ price conversion.
//!
//! Square root prices are computed with the integer table used by the Uniswap v3
//! `TickMath` library, so the results match the chain bit for bit. Prices are
//! `sqrt² / 2¹⁹²`, kept as exact rationals.

use crate::error::DomainError;
use crate::value_objects::price::Price;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

/// Smallest tick supported by the pool contracts.
pub const MIN_TICK: i32 = -887_272;
/// Largest tick supported by the pool contracts.
pub const MAX_TICK: i32 = 887_272;

const RATIO_FACTORS: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x5d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
    (0x80000, 0x48a170391f7dc42444e8fa2),
];

/// `2^96`, the fixed point scale of square root prices.
pub fn q96() -> BigInt {
    BigInt::one() << 96
}

/// Returns the Q64.96 square root price at `tick`.
pub fn sqrt_ratio_at_tick(tick: i32) -> Result<BigInt, DomainError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(DomainError::TickOutOfBounds(tick));
    }
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        BigInt::from(0xfffcb933bd6fad37aa2d162d1a594001u128)
    } else {
        BigInt::one() << 128
    };
    for (mask, factor) in RATIO_FACTORS {
        if abs_tick & mask != 0 {
            ratio = (ratio * BigInt::from(factor)) >> 128;
        }
    }

    if tick > 0 {
        let max_word = (BigInt::one() << 256) - 1;
        ratio = max_word / ratio;
    }

    let remainder_mask = (BigInt::one() << 32) - 1;
    let round_up = !(&ratio & &remainder_mask).is_zero();
    let mut sqrt = ratio >> 32;
    if round_up {
        sqrt += 1;
    }
    Ok(sqrt)
}

/// Returns the exact price (raw token1 per raw token0) at `tick`.
pub fn tick_to_price(tick: i32) -> Result<Price, DomainError> {
    let sqrt = sqrt_ratio_at_tick(tick)?;
    Price::from_sqrt_price(&sqrt)
}

fn ratio_at(tick: i32) -> Result<BigRational, DomainError> {
    Ok(tick_to_price(tick)?.into_ratio())
}

/// Greatest tick whose price is not above `price`, clamped to the tick bounds.
pub fn price_to_tick(price: &Price) -> Result<i32, DomainError> {
    let target = price.as_ratio();
    if *target < ratio_at(MIN_TICK)? {
        return Ok(MIN_TICK);
    }
    let (mut lo, mut hi) = (MIN_TICK, MAX_TICK);
    while lo < hi {
        // upper midpoint so `lo = mid` always makes progress
        let mid = lo + (hi - lo + 1) / 2;
        if ratio_at(mid)? <= *target {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Ok(lo)
}

/// Smallest tick whose price is not below `price`, clamped to the tick bounds.
pub fn price_to_tick_ceil(price: &Price) -> Result<i32, DomainError> {
    let floor = price_to_tick(price)?;
    if floor < MAX_TICK && ratio_at(floor)? < *price.as_ratio() {
        return Ok(floor + 1);
    }
    Ok(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sqrt_ratio_bounds() {
        assert_eq!(sqrt_ratio_at_tick(MIN_TICK).unwrap(), BigInt::from(4_295_128_739u64));
        assert_eq!(
            sqrt_ratio_at_tick(MAX_TICK).unwrap(),
            BigInt::from_str("1461446703485210103287273052203988822378723970342").unwrap()
        );
        assert_eq!(sqrt_ratio_at_tick(0).unwrap(), q96());
    }

    #[test]
    fn test_sqrt_ratio_out_of_bounds() {
        assert_eq!(
            sqrt_ratio_at_tick(MAX_TICK + 1),
            Err(DomainError::TickOutOfBounds(MAX_TICK + 1))
        );
        assert!(sqrt_ratio_at_tick(MIN_TICK - 1).is_err());
    }

    #[test]
    fn test_tick_to_price() {
        let p = tick_to_price(0).unwrap();
        assert_eq!(*p.as_ratio(), BigRational::one());

        // 1.0001^100 ~= 1.01004966
        let p100 = tick_to_price(100).unwrap();
        let lower = BigRational::new(BigInt::from(101_004_960), BigInt::from(100_000_000));
        let upper = BigRational::new(BigInt::from(101_004_970), BigInt::from(100_000_000));
        assert!(*p100.as_ratio() > lower && *p100.as_ratio() < upper);
    }

    #[test]
    fn test_price_to_tick_exact_ticks() {
        for tick in [-200_000, -60, -1, 0, 1, 60, 100, 200_000] {
            let price = tick_to_price(tick).unwrap();
            assert_eq!(price_to_tick(&price).unwrap(), tick);
            assert_eq!(price_to_tick_ceil(&price).unwrap(), tick);
        }
    }

    #[test]
    fn test_price_to_tick_between_ticks() {
        // 1.005 sits between tick 49 (~1.00491) and tick 50 (~1.00501)
        let price = Price::new(BigRational::new(BigInt::from(201), BigInt::from(200))).unwrap();
        assert_eq!(price_to_tick(&price).unwrap(), 49);
        assert_eq!(price_to_tick_ceil(&price).unwrap(), 50);
    }

    #[test]
    fn test_price_to_tick_clamps() {
        let tiny = Price::new(BigRational::new(BigInt::one(), BigInt::one() << 200)).unwrap();
        assert_eq!(price_to_tick(&tiny).unwrap(), MIN_TICK);
        let huge = Price::new(BigRational::from_integer(BigInt::one() << 200)).unwrap();
        assert_eq!(price_to_tick(&huge).unwrap(), MAX_TICK);
        assert_eq!(price_to_tick_ceil(&huge).unwrap(), MAX_TICK);
    }
}
