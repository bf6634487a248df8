use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniswap v3 fee tiers. Each fee maps to exactly one tick spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FeeTier {
    /// 0.01%, spacing 1.
    Lowest,
    /// 0.05%, spacing 10.
    Low,
    /// 0.3%, spacing 60.
    Medium,
    /// 1%, spacing 200.
    High,
}

impl FeeTier {
    /// Fee in hundredths of a basis point, as stored on chain.
    #[must_use]
    pub const fn fee(self) -> u32 {
        match self {
            Self::Lowest => 100,
            Self::Low => 500,
            Self::Medium => 3000,
            Self::High => 10_000,
        }
    }

    /// Tick spacing enabled for this fee.
    #[must_use]
    pub const fn tick_spacing(self) -> i32 {
        match self {
            Self::Lowest => 1,
            Self::Low => 10,
            Self::Medium => 60,
            Self::High => 200,
        }
    }
}

impl TryFrom<u32> for FeeTier {
    type Error = DomainError;

    fn try_from(fee: u32) -> Result<Self, Self::Error> {
        match fee {
            100 => Ok(Self::Lowest),
            500 => Ok(Self::Low),
            3000 => Ok(Self::Medium),
            10_000 => Ok(Self::High),
            other => Err(DomainError::UnsupportedFeeTier(other)),
        }
    }
}

impl From<FeeTier> for u32 {
    fn from(tier: FeeTier) -> Self {
        tier.fee()
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fee())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_tier_pairs() {
        for tier in [FeeTier::Lowest, FeeTier::Low, FeeTier::Medium, FeeTier::High] {
            assert_eq!(FeeTier::try_from(tier.fee()).unwrap(), tier);
        }
        assert_eq!(FeeTier::Medium.tick_spacing(), 60);
        assert_eq!(
            FeeTier::try_from(2500),
            Err(DomainError::UnsupportedFeeTier(2500))
        );
    }
}
