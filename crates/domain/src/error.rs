//! Errors raised by the domain layer.

use thiserror::Error;

/// Errors produced while building domain values or sizing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The requested price band cannot be built.
    #[error("invalid range: {0}")]
    InvalidRange(String),
    /// A price was zero, negative or malformed.
    #[error("invalid price: {0}")]
    InvalidPrice(String),
    /// A tick index fell outside the supported tick bounds.
    #[error("tick {0} is outside the supported tick bounds")]
    TickOutOfBounds(i32),
    /// Pool data violates an invariant.
    #[error("invalid pool: {0}")]
    InvalidPool(String),
    /// An amount does not fit the target integer width or is negative.
    #[error("amount does not fit in 256 bits")]
    AmountOverflow,
    /// Fee has no known tick spacing.
    #[error("unsupported fee tier: {0}")]
    UnsupportedFeeTier(u32),
    /// Malformed hex or address input.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
