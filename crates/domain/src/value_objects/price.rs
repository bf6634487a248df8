use crate::error::DomainError;
use crate::math::rational::{decimal_to_ratio, pow10, ratio_to_decimal};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed};
use rust_decimal::Decimal;
use std::fmt;

/// Strictly positive exact price, in raw token1 units per raw token0 unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(BigRational);

impl Price {
    /// Creates a price, rejecting zero and negative values.
    pub fn new(value: BigRational) -> Result<Self, DomainError> {
        if !value.is_positive() {
            return Err(DomainError::InvalidPrice(format!("{value} is not positive")));
        }
        Ok(Self(value))
    }

    /// Price from a Q64.96 square root price: `sqrt² / 2¹⁹²`.
    pub fn from_sqrt_price(sqrt_price_x96: &BigInt) -> Result<Self, DomainError> {
        let denominator = BigInt::one() << 192;
        Self::new(BigRational::new(sqrt_price_x96 * sqrt_price_x96, denominator))
    }

    /// Raw price from a human price (token1 per token0 in whole units).
    pub fn from_decimal(value: Decimal, decimals0: u8, decimals1: u8) -> Result<Self, DomainError> {
        let human = decimal_to_ratio(value);
        Self::new(human * decimal_shift(decimals1, decimals0))
    }

    pub fn as_ratio(&self) -> &BigRational {
        &self.0
    }

    pub fn into_ratio(self) -> BigRational {
        self.0
    }

    /// Price of token1 in token0.
    #[must_use]
    pub fn invert(&self) -> Self {
        Self(self.0.recip())
    }

    /// Value in token1 of `amount0` raw units of token0.
    pub fn quote(&self, amount0: &BigInt) -> BigRational {
        BigRational::from_integer(amount0.clone()) * &self.0
    }

    /// Human price of token0 expressed in token1, rounded to `scale` places.
    pub fn to_decimal(&self, decimals0: u8, decimals1: u8, scale: u32) -> Result<Decimal, DomainError> {
        ratio_to_decimal(&(&self.0 * decimal_shift(decimals0, decimals1)), scale)
    }
}

/// `10^(a - b)` as a rational.
fn decimal_shift(a: u8, b: u8) -> BigRational {
    if a >= b {
        BigRational::from_integer(pow10(u32::from(a - b)))
    } else {
        BigRational::new(BigInt::one(), pow10(u32::from(b - a)))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
