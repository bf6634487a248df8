//! Errors raised while talking to the chain.

use alloy::transports::TransportError;
use rangekeeper_domain::DomainError;
use thiserror::Error;

/// Errors from the RPC provider and contract adapters.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or a JSON-RPC error object from the node.
    #[error("rpc error: {0}")]
    Transport(#[from] TransportError),
    /// Gas station transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// A response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The transaction was mined with a failed status.
    #[error("transaction {hash} reverted")]
    Reverted {
        /// Hash of the reverted transaction.
        hash: String,
    },
    /// A requested object does not exist on chain.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<DomainError> for GatewayError {
    fn from(err: DomainError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<alloy::sol_types::Error> for GatewayError {
    fn from(err: alloy::sol_types::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
