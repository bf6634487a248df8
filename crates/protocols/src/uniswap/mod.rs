//! Uniswap v3 adapter over an alloy provider.
//!
//! - Pool, token and position reads through the factory, pool and
//!   NonfungiblePositionManager contracts
//! - Quotes through Quoter v1
//! - Calldata for approvals, burns, swaps and mints
//! - Mint receipt parsing

/// Deployment addresses and `sol!` interfaces.
pub mod contracts;
/// Calldata builders.
pub mod encoder;
/// Receipt log parsing.
pub mod events;
/// `ChainGateway` and `QuoteOracle` implementation.
pub mod gateway;

pub use contracts::UniswapAddresses;
pub use encoder::UniswapCallEncoder;
pub use events::{parse_minted_position_id, transfer_log};
pub use gateway::UniswapGateway;
