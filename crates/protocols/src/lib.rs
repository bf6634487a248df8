//! Chain collaborators for the rebalancer.
//!
//! The traits in [`gateway`] are what the execution layer consumes. The rest
//! of the crate implements them for an EVM node reached over JSON-RPC and the
//! Uniswap v3 periphery contracts:
//! - [`rpc`]: alloy HTTP provider
//! - [`uniswap`]: pool/position reads, quoter, calldata builders, receipt parsing
//! - [`gas`]: gas price oracles

mod convert;
/// Gateway errors.
pub mod error;
/// Gas price oracles.
pub mod gas;
/// Collaborator traits and shared chain types.
pub mod gateway;
/// Node connection.
pub mod rpc;
/// Uniswap v3 adapter.
pub mod uniswap;

pub use error::GatewayError;
pub use gateway::{
    BurnRequest, Call, CallEncoder, ChainGateway, GasOracle, Log, MintRequest, PositionData,
    QuoteOracle, Receipt, SwapRequest, TxHash, TxRequest,
};
