//! Lifecycle controller for the managed position.
//!
//! Every cycle re-derives the position from the chain, so a cycle interrupted
//! between burn and mint is finished by the next one.

use super::RebalanceExecutor;
use crate::error::ExecutionError;
use crate::lifecycle::{RebalanceData, RebalanceReason};
use crate::sync::PositionScanner;
use rangekeeper_domain::entities::{PairSpec, Position, PositionId, is_in_range, lower_price};
use rangekeeper_protocols::ChainGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Configuration for the lifecycle controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Pair and fee tier of the managed position.
    pub pair: PairSpec,
    /// Time between cycles.
    pub poll_interval: Duration,
}

impl ControllerConfig {
    /// Creates a config for `pair` with the default poll interval.
    pub fn new(pair: PairSpec) -> Self {
        Self {
            pair,
            poll_interval: Duration::from_secs(300), // 5 minutes
        }
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// What the controller believes about the position after the last cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// No live position.
    NoPosition,
    /// A live position is being held.
    Active(Position),
    /// A position is being replaced.
    Rebalancing(Position),
}

/// Result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The position is in range and was left alone.
    Held {
        /// Held position.
        position: PositionId,
    },
    /// A position was opened where none existed.
    Opened {
        /// New position.
        position: PositionId,
    },
    /// An out of range position was burned and replaced.
    Rebalanced {
        /// Burned position.
        old: PositionId,
        /// New position.
        new: PositionId,
    },
}

/// Keeps one position on the configured pair centered on the market price.
pub struct PositionLifecycleController {
    /// Chain reads.
    gateway: Arc<dyn ChainGateway>,
    /// Position discovery.
    scanner: PositionScanner,
    /// Writes.
    executor: RebalanceExecutor,
    /// Configuration.
    config: ControllerConfig,
    /// State after the last cycle.
    state: ControllerState,
    /// Whether allowances were checked since start.
    prepared: bool,
}

impl PositionLifecycleController {
    /// Creates a new controller. The state is derived on the first cycle.
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        executor: RebalanceExecutor,
        config: ControllerConfig,
    ) -> Self {
        Self {
            scanner: PositionScanner::new(gateway.clone()),
            gateway,
            executor,
            config,
            state: ControllerState::NoPosition,
            prepared: false,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn executor(&self) -> &RebalanceExecutor {
        &self.executor
    }

    /// Approves the position manager and swap router on both pool tokens.
    pub async fn prepare(&self) -> Result<usize, ExecutionError> {
        let pool = self
            .gateway
            .get_pool_state(&self.config.pair)
            .await
            .map_err(ExecutionError::ChainRead)?;
        let approvals = self.executor.prepare(&pool).await?;
        info!(pair = %self.config.pair, approvals, "Allowances ready");
        Ok(approvals)
    }

    /// Runs one evaluation cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, ExecutionError> {
        let pair = self.config.pair;
        let pool = Arc::new(
            self.gateway
                .get_pool_state(&pair)
                .await
                .map_err(ExecutionError::ChainRead)?,
        );
        debug!(pool = %pool.address, tick = pool.tick, "Read pool state");

        let found = self
            .scanner
            .scan(&self.executor.owner(), &pair, pool.clone())
            .await?;

        let Some((old_id, position)) = found.and_then(|p| p.id.map(|id| (id, p))) else {
            return self.open().await;
        };

        if is_in_range(&position)? {
            debug!(
                position = %old_id,
                tick = pool.tick,
                tick_lower = position.tick_lower,
                tick_upper = position.tick_upper,
                "Position in range"
            );
            self.state = ControllerState::Active(position);
            return Ok(CycleOutcome::Held { position: old_id });
        }

        let reason = if pool.price()? <= lower_price(&position)? {
            RebalanceReason::PriceBelowRange
        } else {
            RebalanceReason::PriceAboveRange
        };
        info!(
            position = %old_id,
            tick = pool.tick,
            tick_lower = position.tick_lower,
            tick_upper = position.tick_upper,
            reason = ?reason,
            "Position out of range, rebalancing"
        );
        self.state = ControllerState::Rebalancing(position.clone());

        self.executor.burn(old_id, &position, reason).await?;
        let (new_id, opened) = self.executor.open(&pair).await?;

        self.executor
            .lifecycle()
            .record_rebalance(
                new_id,
                pool.address,
                RebalanceData {
                    old_position: old_id,
                    old_tick_lower: position.tick_lower,
                    old_tick_upper: position.tick_upper,
                    new_tick_lower: opened.tick_lower,
                    new_tick_upper: opened.tick_upper,
                    old_liquidity: position.liquidity,
                    new_liquidity: opened.liquidity,
                    reason,
                },
            )
            .await;
        self.state = ControllerState::Active(opened);

        Ok(CycleOutcome::Rebalanced {
            old: old_id,
            new: new_id,
        })
    }

    /// Create path: equalize, mint and become active.
    async fn open(&mut self) -> Result<CycleOutcome, ExecutionError> {
        self.state = ControllerState::NoPosition;
        info!(pair = %self.config.pair, "No live position, opening one");

        let (id, position) = self.executor.open(&self.config.pair).await?;
        self.state = ControllerState::Active(position);
        Ok(CycleOutcome::Opened { position: id })
    }

    /// Checks allowances until that succeeds once, then runs a cycle.
    async fn prepare_and_cycle(&mut self) -> Result<CycleOutcome, ExecutionError> {
        if !self.prepared {
            self.prepare().await?;
            self.prepared = true;
        }
        self.run_cycle().await
    }

    /// Runs cycles until `shutdown` turns true or its sender is dropped.
    ///
    /// Allowances are checked before the first cycle and again after any
    /// failed check. Fatal errors stop the loop and are returned; other
    /// errors are logged and the cycle is retried after the poll interval.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), ExecutionError> {
        info!(
            pair = %self.config.pair,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting lifecycle controller"
        );

        while !*shutdown.borrow() {
            match self.prepare_and_cycle().await {
                Ok(outcome) => debug!(outcome = ?outcome, "Cycle complete"),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Fatal error, stopping lifecycle controller");
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "Cycle failed, retrying after poll interval"),
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let stats = self.executor.lifecycle().get_aggregate_stats().await;
        info!(
            positions = stats.total_positions,
            rebalances = stats.total_rebalances,
            swaps = stats.total_swaps,
            "Lifecycle controller stopped"
        );
        Ok(())
    }
}
