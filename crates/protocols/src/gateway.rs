//! Collaborator traits consumed by the lifecycle controller.

use crate::error::GatewayError;
use alloy::hex;
use async_trait::async_trait;
use primitive_types::{H256, U256};
use rangekeeper_domain::entities::{PairSpec, Pool, PositionId, Token};
use rangekeeper_domain::enums::TradeKind;
use rangekeeper_domain::value_objects::Address;
use std::fmt;

/// Upper bound on the id buffer reserved up front. The count comes from the
/// chain and is not trusted for allocation.
const MAX_PREALLOCATED_IDS: u64 = 64;

/// Transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub H256);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(self.0.as_bytes()))
    }
}

/// Contract call: target, calldata and attached native value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: Address,
    pub data: Vec<u8>,
    pub value: U256,
}

/// Transaction ready to be signed by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub call: Call,
    pub gas_limit: u64,
    pub gas_price: U256,
}

/// Event log emitted by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// Receipt of a successful transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub logs: Vec<Log>,
}

/// Raw position record from the position manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionData {
    pub id: PositionId,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

/// Read and write access to the chain.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Current state of the pool for `pair`.
    async fn get_pool_state(&self, pair: &PairSpec) -> Result<Pool, GatewayError>;

    async fn get_position(&self, id: &PositionId) -> Result<PositionData, GatewayError>;

    /// Number of position NFTs held by `owner`.
    async fn owned_position_count(&self, owner: &Address) -> Result<u64, GatewayError>;

    async fn position_id_at(&self, owner: &Address, index: u64)
    -> Result<PositionId, GatewayError>;

    /// Reads the owned count, then exactly that many indices. A failed lookup
    /// is an error, never the end of the list.
    async fn list_owned_position_ids(
        &self,
        owner: &Address,
    ) -> Result<Vec<PositionId>, GatewayError> {
        let count = self.owned_position_count(owner).await?;
        let mut ids = Vec::with_capacity(count.min(MAX_PREALLOCATED_IDS) as usize);
        for index in 0..count {
            ids.push(self.position_id_at(owner, index).await?);
        }
        Ok(ids)
    }

    /// Balance of `token` held by `owner`. The wrapped native token reports
    /// the native balance.
    async fn balance_of(&self, owner: &Address, token: &Token) -> Result<U256, GatewayError>;

    async fn allowance(
        &self,
        owner: &Address,
        token: &Token,
        spender: &Address,
    ) -> Result<U256, GatewayError>;

    async fn submit(&self, tx: &TxRequest) -> Result<TxHash, GatewayError>;

    /// Waits until `hash` is mined with `confirmations` blocks on top of and
    /// including its block. Reverted transactions are errors.
    async fn confirm(&self, hash: &TxHash, confirmations: u64) -> Result<Receipt, GatewayError>;
}

/// Swap quotes for a single pool.
#[async_trait]
pub trait QuoteOracle: Send + Sync {
    async fn quote_exact_input(
        &self,
        token_in: &Address,
        token_out: &Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<U256, GatewayError>;

    async fn quote_exact_output(
        &self,
        token_in: &Address,
        token_out: &Address,
        fee: u32,
        amount_out: U256,
    ) -> Result<U256, GatewayError>;
}

/// Gas price source, wei per gas.
#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn gas_price(&self) -> Result<U256, GatewayError>;
}

/// Remove all liquidity from a position and collect everything owed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnRequest {
    pub id: PositionId,
    pub liquidity: u128,
    pub token0: Address,
    pub token1: Address,
    pub amount0_min: U256,
    pub amount1_min: U256,
    pub recipient: Address,
}

/// Single-pool swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub kind: TradeKind,
    /// Input amount for exact input, output amount for exact output.
    pub amount: U256,
    /// Minimum output for exact input, maximum input for exact output.
    pub limit: U256,
    pub recipient: Address,
}

/// Open a new position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0_desired: U256,
    pub amount1_desired: U256,
    pub amount0_min: U256,
    pub amount1_min: U256,
    pub recipient: Address,
}

/// Builds calldata for the write operations.
pub trait CallEncoder: Send + Sync {
    fn position_manager(&self) -> Address;

    fn swap_router(&self) -> Address;

    /// Unlimited allowance for `spender`.
    fn approve(&self, token: &Address, spender: &Address) -> Call;

    fn burn(&self, request: &BurnRequest) -> Call;

    fn swap(&self, request: &SwapRequest) -> Call;

    fn mint(&self, request: &MintRequest) -> Call;
}
