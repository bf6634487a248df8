//! Conversions between `U256`, `BigInt`, `BigRational` and `Decimal`.
//!
//! Everything that sizes an on-chain amount stays in exact integers or
//! rationals. `Decimal` only shows up at the human boundary.

use crate::error::DomainError;
use num_bigint::{BigInt, BigUint, Sign};
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use primitive_types::U256;
use rust_decimal::Decimal;

/// Exact conversion of a 256-bit word into a big integer.
pub fn u256_to_bigint(value: U256) -> BigInt {
    let mut digits = Vec::with_capacity(8);
    for limb in value.0 {
        digits.push(limb as u32);
        digits.push((limb >> 32) as u32);
    }
    BigInt::from_biguint(Sign::Plus, BigUint::new(digits))
}

/// Converts a non-negative big integer back into a 256-bit word.
pub fn bigint_to_u256(value: &BigInt) -> Result<U256, DomainError> {
    if value.is_negative() {
        return Err(DomainError::AmountOverflow);
    }
    let digits = value.magnitude().to_u64_digits();
    if digits.len() > 4 {
        return Err(DomainError::AmountOverflow);
    }
    let mut limbs = [0u64; 4];
    limbs[..digits.len()].copy_from_slice(&digits);
    Ok(U256(limbs))
}

/// `10^exp` as a big integer.
pub fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// Exact rational value of a decimal.
pub fn decimal_to_ratio(value: Decimal) -> BigRational {
    BigRational::new(BigInt::from(value.mantissa()), pow10(value.scale()))
}

/// Rounds a rational to `scale` decimal places (half away from zero).
pub fn ratio_to_decimal(value: &BigRational, scale: u32) -> Result<Decimal, DomainError> {
    let scaled = (value * BigRational::from_integer(pow10(scale))).round();
    let mantissa = scaled
        .to_integer()
        .to_i128()
        .ok_or(DomainError::AmountOverflow)?;
    Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| DomainError::AmountOverflow)
}

/// Like [`ratio_to_decimal`], but drops decimal places until the value fits
/// the 96-bit `Decimal` mantissa.
pub fn ratio_to_decimal_fitting(
    value: &BigRational,
    max_scale: u32,
) -> Result<Decimal, DomainError> {
    (0..=max_scale.min(28))
        .rev()
        .find_map(|scale| ratio_to_decimal(value, scale).ok())
        .ok_or(DomainError::AmountOverflow)
}

/// Largest integer not above `value`, as a `U256`. Negative values clamp to zero.
pub fn floor_to_u256(value: &BigRational) -> Result<U256, DomainError> {
    let floored = value.floor().to_integer();
    if floored.is_negative() {
        return Ok(U256::zero());
    }
    bigint_to_u256(&floored)
}

/// Smallest integer not below `value`, as a `U256`. Negative values clamp to zero.
pub fn ceil_to_u256(value: &BigRational) -> Result<U256, DomainError> {
    let ceiled = value.ceil().to_integer();
    if ceiled.is_negative() || ceiled.is_zero() {
        return Ok(U256::zero());
    }
    bigint_to_u256(&ceiled)
}

/// Rational value of a raw on-chain amount.
pub fn u256_to_ratio(value: U256) -> BigRational {
    BigRational::from_integer(u256_to_bigint(value))
}
