//! Lifecycle tracker for position history.

use super::{
    EventData, LifecycleEvent, LifecycleEventType, PositionClosedData, PositionOpenedData,
    RebalanceData, SwapData,
};
use rangekeeper_domain::entities::PositionId;
use rangekeeper_domain::value_objects::Address;
use rangekeeper_protocols::TxHash;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Summary of a position's lifecycle.
#[derive(Debug, Clone)]
pub struct PositionSummary {
    /// Position id.
    pub position: PositionId,
    /// Pool address.
    pub pool: Address,
    /// When position was opened.
    pub opened_at: chrono::DateTime<chrono::Utc>,
    /// When position was closed (if closed).
    pub closed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Lower tick.
    pub tick_lower: i32,
    /// Upper tick.
    pub tick_upper: i32,
    /// Wallet value in native units at entry, when it could be computed.
    pub entry_value_native: Option<Decimal>,
    /// Whether position is still open.
    pub is_open: bool,
}

/// Positions whose events and summaries are kept: the current one and the
/// one it replaced.
pub const RETAINED_POSITIONS: usize = 2;

/// Equalization swap events kept.
pub const RETAINED_SWAPS: usize = 16;

#[derive(Default)]
struct TrackerState {
    /// Events by position.
    events: HashMap<PositionId, Vec<LifecycleEvent>>,
    /// Position summaries.
    summaries: HashMap<PositionId, PositionSummary>,
    /// Retained positions, oldest first.
    retained: VecDeque<PositionId>,
    /// Latest swaps, oldest first.
    swaps: VecDeque<LifecycleEvent>,
    /// Counters over the whole run, including evicted positions.
    totals: AggregateStats,
    lifetime_secs: i64,
}

impl TrackerState {
    /// Marks `position` as retained, evicting the oldest beyond the limit.
    fn retain(&mut self, position: PositionId) {
        if self.retained.contains(&position) {
            return;
        }
        self.retained.push_back(position);
        while self.retained.len() > RETAINED_POSITIONS {
            if let Some(evicted) = self.retained.pop_front() {
                self.events.remove(&evicted);
                self.summaries.remove(&evicted);
                debug!(position = %evicted, "Evicted position from lifecycle tracker");
            }
        }
    }

    fn add_event(&mut self, position: PositionId, event: LifecycleEvent) {
        self.retain(position);
        self.events.entry(position).or_default().push(event);
    }
}

/// Tracks lifecycle events for the positions opened by this process.
///
/// The tracker is in memory only; the chain stays the source of truth. Only
/// the last [`RETAINED_POSITIONS`] positions and [`RETAINED_SWAPS`] swaps are
/// kept, the aggregate counters cover the whole run.
pub struct LifecycleTracker {
    state: Arc<RwLock<TrackerState>>,
}

impl LifecycleTracker {
    /// Creates a new lifecycle tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TrackerState::default())),
        }
    }

    /// Records a position opened event.
    pub async fn record_position_opened(
        &self,
        position: PositionId,
        pool: Address,
        tx_hash: TxHash,
        data: PositionOpenedData,
    ) {
        let event = LifecycleEvent::new(
            LifecycleEventType::PositionOpened,
            Some(position),
            pool,
            EventData::PositionOpened(data.clone()),
        )
        .with_tx_hash(tx_hash);

        let summary = PositionSummary {
            position,
            pool,
            opened_at: event.timestamp,
            closed_at: None,
            tick_lower: data.tick_lower,
            tick_upper: data.tick_upper,
            entry_value_native: data.entry_value_native,
            is_open: true,
        };

        {
            let mut state = self.state.write().await;
            state.add_event(position, event);
            if state.summaries.insert(position, summary).is_none() {
                state.totals.total_positions += 1;
                state.totals.open_positions += 1;
            }
        }

        info!(
            position = %position,
            tick_lower = data.tick_lower,
            tick_upper = data.tick_upper,
            liquidity = data.liquidity,
            "Position opened"
        );
    }

    /// Records an equalization swap.
    pub async fn record_swap(&self, pool: Address, tx_hash: TxHash, data: SwapData) {
        let event = LifecycleEvent::new(
            LifecycleEventType::BalancesEqualized,
            None,
            pool,
            EventData::Swap(data.clone()),
        )
        .with_tx_hash(tx_hash);

        {
            let mut state = self.state.write().await;
            state.swaps.push_back(event);
            if state.swaps.len() > RETAINED_SWAPS {
                state.swaps.pop_front();
            }
            state.totals.total_swaps += 1;
        }

        debug!(
            direction = ?data.direction,
            sell_amount = %data.sell_amount,
            buy_amount = %data.buy_amount,
            "Balances equalized"
        );
    }

    /// Records a rebalance event against the new position.
    pub async fn record_rebalance(&self, position: PositionId, pool: Address, data: RebalanceData) {
        let event = LifecycleEvent::new(
            LifecycleEventType::Rebalanced,
            Some(position),
            pool,
            EventData::Rebalance(data.clone()),
        );

        {
            let mut state = self.state.write().await;
            state.add_event(position, event);
            state.totals.total_rebalances += 1;
        }

        info!(
            position = %position,
            old_position = %data.old_position,
            old_range = format!("[{}, {}]", data.old_tick_lower, data.old_tick_upper),
            new_range = format!("[{}, {}]", data.new_tick_lower, data.new_tick_upper),
            reason = ?data.reason,
            "Position rebalanced"
        );
    }

    /// Records a position closed event.
    pub async fn record_position_closed(
        &self,
        position: PositionId,
        pool: Address,
        tx_hash: TxHash,
        data: PositionClosedData,
    ) {
        let event = LifecycleEvent::new(
            LifecycleEventType::PositionClosed,
            Some(position),
            pool,
            EventData::PositionClosed(data.clone()),
        )
        .with_tx_hash(tx_hash);
        let closed_at = event.timestamp;

        {
            let mut state = self.state.write().await;
            state.add_event(position, event);

            // Positions opened before this process started have no summary.
            let lifetime = state
                .summaries
                .get_mut(&position)
                .filter(|summary| summary.is_open)
                .map(|summary| {
                    summary.closed_at = Some(closed_at);
                    summary.is_open = false;
                    (closed_at - summary.opened_at).num_seconds()
                });
            if let Some(lifetime) = lifetime {
                state.totals.open_positions -= 1;
                state.totals.closed_positions += 1;
                state.lifetime_secs += lifetime;
            }
        }

        info!(
            position = %position,
            liquidity = data.liquidity_removed,
            reason = ?data.reason,
            "Position closed"
        );
    }

    /// Gets the retained events for a position.
    pub async fn get_events(&self, position: &PositionId) -> Vec<LifecycleEvent> {
        self.state
            .read()
            .await
            .events
            .get(position)
            .cloned()
            .unwrap_or_default()
    }

    /// Gets the latest swaps, oldest first.
    pub async fn get_swaps(&self) -> Vec<LifecycleEvent> {
        self.state.read().await.swaps.iter().cloned().collect()
    }

    /// Gets the summary for a retained position.
    pub async fn get_summary(&self, position: &PositionId) -> Option<PositionSummary> {
        self.state.read().await.summaries.get(position).cloned()
    }

    /// Gets summaries for open positions only.
    pub async fn get_open_positions(&self) -> Vec<PositionSummary> {
        self.state
            .read()
            .await
            .summaries
            .values()
            .filter(|s| s.is_open)
            .cloned()
            .collect()
    }

    /// Gets aggregate statistics.
    pub async fn get_aggregate_stats(&self) -> AggregateStats {
        let state = self.state.read().await;
        let mut stats = state.totals.clone();
        if stats.closed_positions > 0 {
            stats.avg_lifetime_secs = state.lifetime_secs / i64::from(stats.closed_positions);
        }
        stats
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate statistics across all positions.
#[derive(Debug, Clone, Default)]
pub struct AggregateStats {
    /// Total positions opened.
    pub total_positions: u32,
    /// Currently open positions.
    pub open_positions: u32,
    /// Closed positions.
    pub closed_positions: u32,
    /// Total rebalances performed.
    pub total_rebalances: u32,
    /// Total equalization swaps.
    pub total_swaps: u32,
    /// Average lifetime of closed positions in seconds.
    pub avg_lifetime_secs: i64,
}
