//! Lifecycle events for position tracking.

use primitive_types::U256;
use rangekeeper_domain::entities::PositionId;
use rangekeeper_domain::enums::SwapDirection;
use rangekeeper_domain::value_objects::Address;
use rangekeeper_protocols::TxHash;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Type of lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEventType {
    /// Position was minted.
    PositionOpened,
    /// Balances were swapped to parity.
    BalancesEqualized,
    /// Position was replaced by a re-centered one.
    Rebalanced,
    /// Position liquidity was burned and collected.
    PositionClosed,
}

/// A lifecycle event for a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event ID.
    pub id: String,
    /// Event type.
    pub event_type: LifecycleEventType,
    /// Position the event belongs to. `None` for swaps made before the
    /// position exists.
    pub position: Option<PositionId>,
    /// Pool address.
    pub pool: Address,
    /// Transaction hash.
    #[serde(skip)]
    pub tx_hash: Option<TxHash>,
    /// Timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Event-specific data.
    pub data: EventData,
}

impl LifecycleEvent {
    /// Creates a new lifecycle event.
    pub fn new(
        event_type: LifecycleEventType,
        position: Option<PositionId>,
        pool: Address,
        data: EventData,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            position,
            pool,
            tx_hash: None,
            timestamp: chrono::Utc::now(),
            data,
        }
    }

    /// Sets the transaction hash.
    #[must_use]
    pub fn with_tx_hash(mut self, tx_hash: TxHash) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }
}

/// Event-specific data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventData {
    /// Position opened data.
    PositionOpened(PositionOpenedData),
    /// Swap data.
    Swap(SwapData),
    /// Rebalance data.
    Rebalance(RebalanceData),
    /// Position closed data.
    PositionClosed(PositionClosedData),
}

/// Data for position opened event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedData {
    /// Lower tick.
    pub tick_lower: i32,
    /// Upper tick.
    pub tick_upper: i32,
    /// Expected liquidity.
    pub liquidity: u128,
    /// Token0 amount offered.
    pub amount0: U256,
    /// Token1 amount offered.
    pub amount1: U256,
    /// Price of token0 in token1 units at entry, when it fits a `Decimal`.
    pub entry_price: Option<Decimal>,
    /// Wallet value in native units at entry, when it could be computed.
    pub entry_value_native: Option<Decimal>,
}

/// Data for an equalization swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapData {
    /// Swap direction.
    pub direction: SwapDirection,
    /// Token sold.
    pub sell_token: Address,
    /// Token bought.
    pub buy_token: Address,
    /// Exact input amount, or the planned input for exact output swaps.
    pub sell_amount: U256,
    /// Exact output amount, or the planned output for exact input swaps.
    pub buy_amount: U256,
    /// Minimum output or maximum input sent with the swap.
    pub limit: U256,
}

/// Data for rebalance event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceData {
    /// Position that was burned.
    pub old_position: PositionId,
    /// Old lower tick.
    pub old_tick_lower: i32,
    /// Old upper tick.
    pub old_tick_upper: i32,
    /// New lower tick.
    pub new_tick_lower: i32,
    /// New upper tick.
    pub new_tick_upper: i32,
    /// Liquidity before rebalance.
    pub old_liquidity: u128,
    /// Liquidity after rebalance.
    pub new_liquidity: u128,
    /// Reason for rebalance.
    pub reason: RebalanceReason,
}

/// Reason for rebalancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebalanceReason {
    /// Price at or below the lower bound.
    PriceBelowRange,
    /// Price at or above the upper bound.
    PriceAboveRange,
}

/// Data for position closed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedData {
    /// Liquidity removed.
    pub liquidity_removed: u128,
    /// Minimum token0 accepted from the decrease.
    pub amount0_min: U256,
    /// Minimum token1 accepted from the decrease.
    pub amount1_min: U256,
    /// Reason for closing.
    pub reason: RebalanceReason,
}
