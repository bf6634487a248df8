//! Serialized transaction submission.

use crate::error::ExecutionError;
use rangekeeper_domain::value_objects::Address;
use rangekeeper_protocols::{Call, ChainGateway, GasOracle, Receipt, TxRequest};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Gas limits and confirmation depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Gas limit for mint and burn.
    pub position_gas_limit: u64,
    /// Gas limit for swaps.
    pub swap_gas_limit: u64,
    /// Gas limit for approvals.
    pub approve_gas_limit: u64,
    /// Confirmations awaited for approvals, burns and mints.
    pub confirmations: u64,
    /// Confirmations awaited for swaps.
    pub swap_confirmations: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            position_gas_limit: 600_000,
            swap_gas_limit: 300_000,
            approve_gas_limit: 100_000,
            confirmations: 1,
            swap_confirmations: 3,
        }
    }
}

/// Submits transactions one at a time from a single account.
pub struct TransactionManager {
    gateway: Arc<dyn ChainGateway>,
    gas: Arc<dyn GasOracle>,
    from: Address,
    config: TransactionConfig,
    in_flight: Mutex<()>,
}

impl TransactionManager {
    /// Creates a new transaction manager sending from `from`.
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        gas: Arc<dyn GasOracle>,
        from: Address,
        config: TransactionConfig,
    ) -> Self {
        Self {
            gateway,
            gas,
            from,
            config,
            in_flight: Mutex::new(()),
        }
    }

    pub fn sender(&self) -> Address {
        self.from
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Prices, submits and confirms `call`.
    ///
    /// The lock is held from gas pricing until the receipt is confirmed.
    pub async fn execute(
        &self,
        label: &str,
        call: Call,
        gas_limit: u64,
        confirmations: u64,
    ) -> Result<Receipt, ExecutionError> {
        let _guard = self.in_flight.lock().await;

        let gas_price = self
            .gas
            .gas_price()
            .await
            .map_err(ExecutionError::Transaction)?;
        debug!(label, gas_price = %gas_price, gas_limit, "Pricing transaction");

        let request = TxRequest {
            from: self.from,
            call,
            gas_limit,
            gas_price,
        };
        let hash = self
            .gateway
            .submit(&request)
            .await
            .map_err(ExecutionError::from_write)?;
        info!(label, tx = %hash, confirmations, "Transaction submitted");

        let receipt = self
            .gateway
            .confirm(&hash, confirmations)
            .await
            .map_err(ExecutionError::from_write)?;
        info!(label, tx = %hash, block = receipt.block_number, "Transaction confirmed");

        Ok(receipt)
    }
}
