//! Errors raised by the execution layer.

use rangekeeper_domain::DomainError;
use rangekeeper_protocols::GatewayError;
use thiserror::Error;

/// Errors from a lifecycle cycle.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Invalid configuration. Fatal.
    #[error("configuration error: {0}")]
    Config(String),
    /// Domain sizing or validation failure.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Reading chain state failed.
    #[error("chain read failed: {0}")]
    ChainRead(#[source] GatewayError),
    /// Quoting a swap failed.
    #[error("quote failed: {0}")]
    Quote(#[source] GatewayError),
    /// Submitting or confirming a transaction failed.
    #[error("transaction failed: {0}")]
    Transaction(#[source] GatewayError),
    /// A transaction was mined with a failed status.
    #[error("transaction {hash} reverted")]
    TransactionReverted {
        /// Transaction hash.
        hash: String,
    },
    /// The mint receipt holds no position NFT transfer to the owner.
    #[error("mint transaction {hash} has no position transfer")]
    MissingMintEvent {
        /// Transaction hash.
        hash: String,
    },
    /// More than one live position matches the configured pair. Fatal.
    #[error("found {count} open positions for the configured pair, expected at most one")]
    TooManyPositions {
        /// Number of matching positions.
        count: usize,
    },
    /// Balances after reserve are too small to back any liquidity.
    #[error("spendable balances cannot back any liquidity")]
    NothingToMint,
}

impl ExecutionError {
    /// Fatal errors stop the control loop. Everything else is retried on the
    /// next poll.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::TooManyPositions { .. }
                | Self::Domain(DomainError::InvalidRange(_) | DomainError::UnsupportedFeeTier(_))
        )
    }

    /// Maps a failed write, turning reverts into `TransactionReverted`.
    pub fn from_write(err: GatewayError) -> Self {
        match err {
            GatewayError::Reverted { hash } => Self::TransactionReverted { hash },
            other => Self::Transaction(other),
        }
    }
}
