use crate::error::DomainError;
use crate::math::price_tick::{MAX_TICK, MIN_TICK, tick_to_price};
use crate::value_objects::price::Price;

/// Price band, both bounds exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRange {
    pub lower_price: Price,
    pub upper_price: Price,
}

impl PriceRange {
    pub fn new(lower: Price, upper: Price) -> Result<Self, DomainError> {
        if lower >= upper {
            return Err(DomainError::InvalidRange(format!(
                "lower {lower} is not below upper {upper}"
            )));
        }
        Ok(Self {
            lower_price: lower,
            upper_price: upper,
        })
    }

    /// Strict containment: either boundary counts as outside.
    pub fn contains(&self, price: &Price) -> bool {
        in_range(price, &self.lower_price, &self.upper_price)
    }
}

/// `lower < current < upper`.
pub fn in_range(current: &Price, lower: &Price, upper: &Price) -> bool {
    lower < current && current < upper
}

/// Tick band with `tick_lower < tick_upper`, both inside the tick bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickRange {
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl TickRange {
    pub fn new(tick_lower: i32, tick_upper: i32) -> Result<Self, DomainError> {
        for tick in [tick_lower, tick_upper] {
            if !(MIN_TICK..=MAX_TICK).contains(&tick) {
                return Err(DomainError::TickOutOfBounds(tick));
            }
        }
        if tick_lower >= tick_upper {
            return Err(DomainError::InvalidRange(format!(
                "tick_lower {tick_lower} is not below tick_upper {tick_upper}"
            )));
        }
        Ok(Self {
            tick_lower,
            tick_upper,
        })
    }

    pub fn is_aligned(&self, tick_spacing: i32) -> bool {
        self.tick_lower % tick_spacing == 0 && self.tick_upper % tick_spacing == 0
    }

    /// Realized price band of the ticks.
    pub fn price_range(&self) -> Result<PriceRange, DomainError> {
        PriceRange::new(tick_to_price(self.tick_lower)?, tick_to_price(self.tick_upper)?)
    }
}
