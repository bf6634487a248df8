//! Rebalancing execution logic.
//!
//! The executor owns every write the controller makes: approvals, burning
//! the old position, the equalization swap and minting the new position.
//! Each step re-reads the chain state it sizes against.

use crate::error::ExecutionError;
use crate::lifecycle::{
    LifecycleTracker, PositionClosedData, PositionOpenedData, RebalanceReason, SwapData,
};
use crate::transaction::TransactionManager;
use num_bigint::BigInt;
use primitive_types::U256;
use rangekeeper_data::HistoryStore;
use rangekeeper_domain::entities::{PairSpec, Pool, Position, PositionId, token_amounts};
use rangekeeper_domain::enums::TradeKind;
use rangekeeper_domain::equalizer::BalanceEqualizer;
use rangekeeper_domain::history::{PRICE_SCALE, PositionHistoryEntry};
use rangekeeper_domain::math::concentrated_liquidity::{
    get_amounts_for_liquidity, get_max_liquidity_for_amounts,
};
use rangekeeper_domain::math::price_tick::sqrt_ratio_at_tick;
use rangekeeper_domain::math::rational::{bigint_to_u256, u256_to_bigint};
use rangekeeper_domain::range::PriceRangeCalculator;
use rangekeeper_domain::value_objects::{Address, TickRange};
use rangekeeper_domain::DomainError;
use rangekeeper_protocols::uniswap::parse_minted_position_id;
use rangekeeper_protocols::{
    BurnRequest, CallEncoder, ChainGateway, MintRequest, QuoteOracle, Receipt, SwapRequest,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const BPS: u32 = 10_000;

/// Configuration for rebalancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceConfig {
    /// Slippage tolerance in basis points, applied to swap quotes and to the
    /// minimum amounts of burns and mints.
    pub slippage_bps: u32,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 500, // 5%
        }
    }
}

/// Executor for rebalancing operations.
pub struct RebalanceExecutor {
    /// Chain reads.
    gateway: Arc<dyn ChainGateway>,
    /// Swap quotes.
    quoter: Arc<dyn QuoteOracle>,
    /// Calldata builder.
    encoder: Arc<dyn CallEncoder>,
    /// Transaction manager.
    tx_manager: Arc<TransactionManager>,
    /// History writer.
    history: Arc<dyn HistoryStore>,
    /// Lifecycle tracker.
    lifecycle: Arc<LifecycleTracker>,
    /// Band sizing.
    calculator: PriceRangeCalculator,
    /// Swap sizing.
    equalizer: BalanceEqualizer,
    /// Configuration.
    config: RebalanceConfig,
}

impl RebalanceExecutor {
    /// Creates a new rebalance executor.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        quoter: Arc<dyn QuoteOracle>,
        encoder: Arc<dyn CallEncoder>,
        tx_manager: Arc<TransactionManager>,
        history: Arc<dyn HistoryStore>,
        lifecycle: Arc<LifecycleTracker>,
        calculator: PriceRangeCalculator,
        equalizer: BalanceEqualizer,
        config: RebalanceConfig,
    ) -> Self {
        Self {
            gateway,
            quoter,
            encoder,
            tx_manager,
            history,
            lifecycle,
            calculator,
            equalizer,
            config,
        }
    }

    /// The account that signs and receives everything.
    pub fn owner(&self) -> Address {
        self.tx_manager.sender()
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleTracker> {
        &self.lifecycle
    }

    /// Reads the owner's balances of both pool tokens.
    pub async fn balances(&self, pool: &Pool) -> Result<(U256, U256), ExecutionError> {
        let owner = self.owner();
        let balance0 = self
            .gateway
            .balance_of(&owner, &pool.token0)
            .await
            .map_err(ExecutionError::ChainRead)?;
        let balance1 = self
            .gateway
            .balance_of(&owner, &pool.token1)
            .await
            .map_err(ExecutionError::ChainRead)?;
        debug!(
            token0 = %pool.token0,
            balance0 = %balance0,
            token1 = %pool.token1,
            balance1 = %balance1,
            "Read balances"
        );
        Ok((balance0, balance1))
    }

    /// Grants unlimited allowances on both pool tokens to the position
    /// manager and the swap router where none exists yet.
    ///
    /// Returns the number of approvals submitted.
    pub async fn prepare(&self, pool: &Pool) -> Result<usize, ExecutionError> {
        let owner = self.owner();
        let spenders = [self.encoder.position_manager(), self.encoder.swap_router()];
        let tx_config = *self.tx_manager.config();
        let mut submitted = 0;

        for token in [&pool.token0, &pool.token1] {
            for spender in &spenders {
                let allowance = self
                    .gateway
                    .allowance(&owner, token, spender)
                    .await
                    .map_err(ExecutionError::ChainRead)?;
                if !allowance.is_zero() {
                    debug!(token = %token, spender = %spender, "Allowance already granted");
                    continue;
                }
                info!(token = %token, spender = %spender, "Approving spender");
                self.tx_manager
                    .execute(
                        "approve",
                        self.encoder.approve(&token.address, spender),
                        tx_config.approve_gas_limit,
                        tx_config.confirmations,
                    )
                    .await?;
                submitted += 1;
            }
        }
        Ok(submitted)
    }

    /// Removes all liquidity from `position` and collects principal and fees.
    pub async fn burn(
        &self,
        id: PositionId,
        position: &Position,
        reason: RebalanceReason,
    ) -> Result<Receipt, ExecutionError> {
        let (amount0, amount1) = token_amounts(position)?;
        let request = BurnRequest {
            id,
            liquidity: position.liquidity,
            token0: position.pool.token0.address,
            token1: position.pool.token1.address,
            amount0_min: self.min_amount(&amount0)?,
            amount1_min: self.min_amount(&amount1)?,
            recipient: self.owner(),
        };
        info!(
            position = %id,
            liquidity = position.liquidity,
            amount0_min = %request.amount0_min,
            amount1_min = %request.amount1_min,
            "Burning position"
        );

        let tx_config = *self.tx_manager.config();
        let receipt = self
            .tx_manager
            .execute(
                "burn",
                self.encoder.burn(&request),
                tx_config.position_gas_limit,
                tx_config.confirmations,
            )
            .await?;

        self.lifecycle
            .record_position_closed(
                id,
                position.pool.address,
                receipt.tx_hash,
                PositionClosedData {
                    liquidity_removed: position.liquidity,
                    amount0_min: request.amount0_min,
                    amount1_min: request.amount1_min,
                    reason,
                },
            )
            .await;
        Ok(receipt)
    }

    /// Swaps the owner's balances to equal value at the current pool price.
    ///
    /// Returns `None` when the balances are already at parity.
    pub async fn equalize(&self, pair: &PairSpec) -> Result<Option<SwapData>, ExecutionError> {
        let pool = self
            .gateway
            .get_pool_state(pair)
            .await
            .map_err(ExecutionError::ChainRead)?;
        let (balance0, balance1) = self.balances(&pool).await?;
        let plan = self.equalizer.plan(balance0, balance1, &pool)?;
        if plan.is_noop() {
            debug!(pool = %pool.address, "Balances already at parity");
            return Ok(None);
        }

        let fee = pool.fee.fee();
        let kind = plan.trade_kind();
        let (amount, limit) = match kind {
            TradeKind::ExactInput => {
                let quoted = self
                    .quoter
                    .quote_exact_input(&plan.sell_token, &plan.buy_token, fee, plan.sell_amount)
                    .await
                    .map_err(ExecutionError::Quote)?;
                (plan.sell_amount, self.min_out(quoted)?)
            }
            TradeKind::ExactOutput => {
                let quoted = self
                    .quoter
                    .quote_exact_output(&plan.sell_token, &plan.buy_token, fee, plan.buy_amount)
                    .await
                    .map_err(ExecutionError::Quote)?;
                (plan.buy_amount, self.max_in(quoted)?)
            }
        };
        let request = SwapRequest {
            token_in: plan.sell_token,
            token_out: plan.buy_token,
            fee,
            kind,
            amount,
            limit,
            recipient: self.owner(),
        };
        info!(
            direction = ?plan.direction,
            kind = ?kind,
            sell_amount = %plan.sell_amount,
            buy_amount = %plan.buy_amount,
            limit = %limit,
            "Equalizing balances"
        );

        let tx_config = *self.tx_manager.config();
        let receipt = self
            .tx_manager
            .execute(
                "swap",
                self.encoder.swap(&request),
                tx_config.swap_gas_limit,
                tx_config.swap_confirmations,
            )
            .await?;

        let data = SwapData {
            direction: plan.direction,
            sell_token: plan.sell_token,
            buy_token: plan.buy_token,
            sell_amount: plan.sell_amount,
            buy_amount: plan.buy_amount,
            limit,
        };
        self.lifecycle
            .record_swap(pool.address, receipt.tx_hash, data.clone())
            .await;
        Ok(Some(data))
    }

    /// Mints a position centered on the current price with the spendable
    /// balances, then appends a history record.
    pub async fn mint(&self, pair: &PairSpec) -> Result<(PositionId, Position), ExecutionError> {
        let pool = Arc::new(
            self.gateway
                .get_pool_state(pair)
                .await
                .map_err(ExecutionError::ChainRead)?,
        );
        let (range, ticks) = self.calculator.band(&pool)?;
        debug!(
            lower = %range.lower_price,
            upper = %range.upper_price,
            tick_lower = ticks.tick_lower,
            tick_upper = ticks.tick_upper,
            "Computed band"
        );

        let (balance0, balance1) = self.balances(&pool).await?;
        let (spendable0, spendable1) =
            self.equalizer
                .reserve()
                .spendable(&pool, balance0, balance1);

        let sqrt_current = pool.sqrt_price();
        let sqrt_lower = sqrt_ratio_at_tick(ticks.tick_lower)?;
        let sqrt_upper = sqrt_ratio_at_tick(ticks.tick_upper)?;
        let liquidity = get_max_liquidity_for_amounts(
            &sqrt_current,
            &sqrt_lower,
            &sqrt_upper,
            &u256_to_bigint(spendable0),
            &u256_to_bigint(spendable1),
        )?;
        if liquidity == 0 {
            return Err(ExecutionError::NothingToMint);
        }
        let (expected0, expected1) =
            get_amounts_for_liquidity(&sqrt_current, &sqrt_lower, &sqrt_upper, liquidity)?;

        let owner = self.owner();
        let request = MintRequest {
            token0: pool.token0.address,
            token1: pool.token1.address,
            fee: pool.fee.fee(),
            tick_lower: ticks.tick_lower,
            tick_upper: ticks.tick_upper,
            amount0_desired: spendable0,
            amount1_desired: spendable1,
            amount0_min: self.min_amount(&expected0)?,
            amount1_min: self.min_amount(&expected1)?,
            recipient: owner,
        };
        info!(
            tick_lower = ticks.tick_lower,
            tick_upper = ticks.tick_upper,
            liquidity,
            amount0 = %spendable0,
            amount1 = %spendable1,
            "Minting position"
        );

        let tx_config = *self.tx_manager.config();
        let receipt = self
            .tx_manager
            .execute(
                "mint",
                self.encoder.mint(&request),
                tx_config.position_gas_limit,
                tx_config.confirmations,
            )
            .await?;
        let id = parse_minted_position_id(&receipt, &self.encoder.position_manager(), &owner)
            .ok_or_else(|| ExecutionError::MissingMintEvent {
                hash: receipt.tx_hash.to_string(),
            })?;

        // The mint is final from here on; bookkeeping failures only log.
        let entry = self.record_history(&pool, balance0, balance1, &ticks).await;
        let entry_price = pool
            .price()
            .and_then(|p| p.to_decimal(pool.token0.decimals, pool.token1.decimals, PRICE_SCALE))
            .ok();
        self.lifecycle
            .record_position_opened(
                id,
                pool.address,
                receipt.tx_hash,
                PositionOpenedData {
                    tick_lower: ticks.tick_lower,
                    tick_upper: ticks.tick_upper,
                    liquidity,
                    amount0: spendable0,
                    amount1: spendable1,
                    entry_price,
                    entry_value_native: entry.map(|e| e.total_wallet_value_native),
                },
            )
            .await;

        let position = Position::new(
            pool,
            ticks.tick_lower,
            ticks.tick_upper,
            liquidity,
            Some(id),
        )?;
        Ok((id, position))
    }

    /// Builds and appends the history record for a confirmed mint from the
    /// balances read before it. Returns the entry even if appending failed.
    async fn record_history(
        &self,
        pool: &Pool,
        balance0: U256,
        balance1: U256,
        ticks: &TickRange,
    ) -> Option<PositionHistoryEntry> {
        let entry = match PositionHistoryEntry::from_balances(
            pool,
            balance0,
            balance1,
            ticks,
            &self.equalizer.reserve().token,
            chrono::Utc::now().timestamp_millis(),
        ) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Cannot express wallet value, skipping history record");
                return None;
            }
        };
        if let Err(e) = self.history.append(&entry).await {
            warn!(error = %e, "Failed to append history record");
        }
        Some(entry)
    }

    /// Equalizes balances, then mints on the post-swap pool state.
    pub async fn open(&self, pair: &PairSpec) -> Result<(PositionId, Position), ExecutionError> {
        self.equalize(pair).await?;
        self.mint(pair).await
    }

    /// Expected amount reduced by the slippage tolerance.
    fn min_amount(&self, expected: &BigInt) -> Result<U256, DomainError> {
        let scaled = expected * BigInt::from(BPS - self.config.slippage_bps) / BigInt::from(BPS);
        bigint_to_u256(&scaled)
    }

    /// Least acceptable output for an exact input quote.
    fn min_out(&self, quoted: U256) -> Result<U256, DomainError> {
        let scaled = u256_to_bigint(quoted) * BigInt::from(BPS)
            / BigInt::from(BPS + self.config.slippage_bps);
        bigint_to_u256(&scaled)
    }

    /// Largest acceptable input for an exact output quote, rounded up.
    fn max_in(&self, quoted: U256) -> Result<U256, DomainError> {
        let numerator = u256_to_bigint(quoted) * BigInt::from(BPS + self.config.slippage_bps);
        let denominator = BigInt::from(BPS);
        let scaled = (numerator + &denominator - 1) / denominator;
        bigint_to_u256(&scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingHistoryStore, SimOp, SimulatedChain};
    use rangekeeper_domain::entities::is_in_range;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_prepare_approves_missing_allowances_once() {
        let chain = SimulatedChain::new();
        let executor = chain.executor();

        assert_eq!(executor.prepare(&chain.pool()).await.unwrap(), 4);
        assert_eq!(executor.prepare(&chain.pool()).await.unwrap(), 0);
        assert_eq!(chain.ops().len(), 4);
    }

    #[tokio::test]
    async fn test_equalize_sells_token0_surplus_exact_input() {
        let chain = SimulatedChain::new();
        let executor = chain.executor();

        let swap = executor.equalize(&chain.pair()).await.unwrap().unwrap();

        assert_eq!(swap.sell_token, chain.usdc().address);
        let ops = chain.ops();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            SimOp::Swap { kind, limit, .. } => {
                assert_eq!(*kind, TradeKind::ExactInput);
                // 5% below the quote, which equals the planned output
                let expected = swap.buy_amount * U256::from(100u64) / U256::from(105u64);
                assert_eq!(*limit, expected);
            }
            other => panic!("unexpected op {other:?}"),
        }

        // a second pass finds nothing left to trade
        assert!(executor.equalize(&chain.pair()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_equalize_buys_token0_exact_output() {
        let chain = SimulatedChain::new();
        chain.set_balance(chain.usdc().address, U256::zero());
        let executor = chain.executor();

        let swap = executor.equalize(&chain.pair()).await.unwrap().unwrap();

        assert_eq!(swap.buy_token, chain.usdc().address);
        match &chain.ops()[0] {
            SimOp::Swap { kind, amount, .. } => {
                assert_eq!(*kind, TradeKind::ExactOutput);
                assert_eq!(*amount, swap.buy_amount);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mint_records_history_and_parses_id() {
        let chain = SimulatedChain::new();
        let executor = chain.executor();

        let (id, position) = executor.open(&chain.pair()).await.unwrap();

        assert_eq!(position.id, Some(id));
        assert!(position.liquidity > 0);
        assert!(is_in_range(&position).unwrap());
        assert_eq!(position.tick_lower % 60, 0);
        assert_eq!(position.tick_upper % 60, 0);
        assert_eq!(chain.history_len().await, 1);
        assert_eq!(chain.live_position_count(), 1);
    }

    #[tokio::test]
    async fn test_mint_with_balance_beyond_decimal_range() {
        let chain = SimulatedChain::new();
        // 1e11 WETH, too many whole units for 18 decimal places
        chain.set_balance(chain.weth().address, U256::exp10(29));
        let executor = chain.executor();

        let (id, position) = executor.mint(&chain.pair()).await.unwrap();

        assert_eq!(position.id, Some(id));
        assert_eq!(chain.live_position_count(), 1);
        let entries = chain.history_entries().await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].total_wallet_value_native >= Decimal::from(100_000_000_000u64));
        let summary = executor.lifecycle().get_summary(&id).await.unwrap();
        assert_eq!(
            summary.entry_value_native,
            Some(entries[0].total_wallet_value_native)
        );
    }

    #[tokio::test]
    async fn test_history_failure_keeps_minted_position() {
        let chain = SimulatedChain::new();
        let executor = chain.executor_with_history(Arc::new(FailingHistoryStore));

        let (id, position) = executor.open(&chain.pair()).await.unwrap();

        assert_eq!(position.id, Some(id));
        assert_eq!(chain.live_position_count(), 1);
        let summary = executor.lifecycle().get_summary(&id).await.unwrap();
        assert!(summary.is_open);
        assert!(summary.entry_value_native.is_some());
        assert_eq!(executor.lifecycle().get_events(&id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_mint_without_balances_fails() {
        let chain = SimulatedChain::new();
        chain.set_balance(chain.usdc().address, U256::zero());
        chain.set_balance(chain.weth().address, U256::zero());
        let executor = chain.executor();

        let err = executor.mint(&chain.pair()).await.unwrap_err();

        assert!(matches!(err, ExecutionError::NothingToMint));
        assert!(chain.ops().is_empty());
    }

    #[tokio::test]
    async fn test_burn_empties_position() {
        let chain = SimulatedChain::new();
        let executor = chain.executor();
        let (id, position) = executor.open(&chain.pair()).await.unwrap();

        executor
            .burn(id, &position, RebalanceReason::PriceAboveRange)
            .await
            .unwrap();

        assert_eq!(chain.live_position_count(), 0);
        assert!(!executor.lifecycle().get_summary(&id).await.unwrap().is_open);
    }

    #[test]
    fn test_slippage_bounds() {
        let chain = SimulatedChain::new();
        let executor = chain.executor();

        assert_eq!(
            executor.min_out(U256::from(1_050u64)).unwrap(),
            U256::from(1_000u64)
        );
        assert_eq!(
            executor.max_in(U256::from(1_000u64)).unwrap(),
            U256::from(1_050u64)
        );
        assert_eq!(executor.max_in(U256::from(1u64)).unwrap(), U256::from(2u64));
        assert_eq!(
            executor.min_amount(&BigInt::from(1_000)).unwrap(),
            U256::from(950u64)
        );
    }
}
