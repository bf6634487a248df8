//! Price band calculation and tick alignment.
//!
//! The band is symmetric around the current price in exact arithmetic. Tick
//! alignment always widens it: the lower bound is rounded down and the upper
//! bound up, so the realized band contains the requested one.

use crate::entities::pool::Pool;
use crate::error::DomainError;
use crate::math::price_tick::{MAX_TICK, MIN_TICK, price_to_tick, price_to_tick_ceil};
use crate::value_objects::{
    percentage::Percentage,
    price::Price,
    price_range::{PriceRange, TickRange},
};
use num_rational::BigRational;
use num_traits::{One, Signed};

/// Computes `current ± current * width`.
///
/// `width` is a fraction (`0.02` for 2%) and must lie strictly between 0 and 1.
pub fn calculate_price_range(
    current: &Price,
    width: &Percentage,
) -> Result<PriceRange, DomainError> {
    let fraction = width.as_ratio();
    if !fraction.is_positive() || fraction >= BigRational::one() {
        return Err(DomainError::InvalidRange(format!(
            "width {width} must be between 0% and 100%"
        )));
    }
    let diff = current.as_ratio() * &fraction;
    let lower = Price::new(current.as_ratio() - &diff)?;
    let upper = Price::new(current.as_ratio() + &diff)?;
    PriceRange::new(lower, upper)
}

/// Lowest tick usable with `tick_spacing`.
pub fn min_usable_tick(tick_spacing: i32) -> i32 {
    -(MIN_TICK.unsigned_abs() as i32 / tick_spacing) * tick_spacing
}

/// Highest tick usable with `tick_spacing`.
pub fn max_usable_tick(tick_spacing: i32) -> i32 {
    (MAX_TICK / tick_spacing) * tick_spacing
}

/// Converts a price band into spacing-aligned ticks that contain it.
pub fn align_to_ticks(range: &PriceRange, tick_spacing: i32) -> Result<TickRange, DomainError> {
    if tick_spacing <= 0 {
        return Err(DomainError::InvalidRange(format!(
            "tick spacing {tick_spacing} must be positive"
        )));
    }
    let raw_lower = price_to_tick(&range.lower_price)?;
    let raw_upper = price_to_tick_ceil(&range.upper_price)?;

    let lower = raw_lower.div_euclid(tick_spacing) * tick_spacing;
    let upper = -((-raw_upper).div_euclid(tick_spacing)) * tick_spacing;

    let lower = lower.max(min_usable_tick(tick_spacing));
    let upper = upper.min(max_usable_tick(tick_spacing));

    if lower >= upper {
        return Err(DomainError::InvalidRange(format!(
            "aligned ticks {lower}..{upper} are empty"
        )));
    }
    TickRange::new(lower, upper)
}

/// Holds the configured band width and produces bands for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRangeCalculator {
    width: Percentage,
}

impl PriceRangeCalculator {
    /// Creates a new calculator, validating the width.
    pub fn new(width: Percentage) -> Result<Self, DomainError> {
        let unit = Price::new(BigRational::one())?;
        calculate_price_range(&unit, &width)?;
        Ok(Self { width })
    }

    pub fn width(&self) -> Percentage {
        self.width
    }

    pub fn calculate(&self, current: &Price) -> Result<PriceRange, DomainError> {
        calculate_price_range(current, &self.width)
    }

    /// Intended band around the pool price and its aligned ticks.
    pub fn band(&self, pool: &Pool) -> Result<(PriceRange, TickRange), DomainError> {
        let range = self.calculate(&pool.price()?)?;
        let ticks = align_to_ticks(&range, pool.tick_spacing())?;
        Ok((range, ticks))
    }
}
