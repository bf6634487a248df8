//! In-memory chain used to exercise the execution layer without a network.
//!
//! Calldata is a JSON encoded [`SimOp`]; the simulated chain applies it to
//! balances and positions at the current pool price.

use crate::strategy::{RebalanceConfig, RebalanceExecutor};
use crate::transaction::{TransactionConfig, TransactionManager};
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;
use primitive_types::{H256, U256};
use rangekeeper_data::{HistoryError, HistoryStore, InMemoryHistoryStore};
use rangekeeper_domain::history::PositionHistoryEntry;
use rangekeeper_domain::entities::{PairSpec, Pool, PositionId, Token};
use rangekeeper_domain::enums::TradeKind;
use rangekeeper_domain::equalizer::{BalanceEqualizer, NativeReserve};
use rangekeeper_domain::fees::FeeTier;
use rangekeeper_domain::math::concentrated_liquidity::{
    get_amounts_for_liquidity, get_max_liquidity_for_amounts,
};
use rangekeeper_domain::math::price_tick::sqrt_ratio_at_tick;
use rangekeeper_domain::math::rational::{
    bigint_to_u256, ceil_to_u256, floor_to_u256, u256_to_bigint, u256_to_ratio,
};
use rangekeeper_domain::range::PriceRangeCalculator;
use rangekeeper_domain::value_objects::{Address, Percentage};
use rangekeeper_protocols::uniswap::transfer_log;
use rangekeeper_protocols::{
    BurnRequest, Call, CallEncoder, ChainGateway, GasOracle, GatewayError, Log, MintRequest,
    PositionData, QuoteOracle, Receipt, SwapRequest, TxHash, TxRequest,
};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
const POOL: &str = "0x8ad599c3A0ff1De082011EFDDc58f1908eb6e6D8";
const MANAGER: &str = "0xC36442b4a4522E871399CD717aBDD847Ab11FE88";
const ROUTER: &str = "0xE592427A0AEce92De3Edee1F18E0157C05861564";
const OWNER: &str = "0x00000000000000000000000000000000000000aa";

/// About 2000 USDC per WETH.
const START_TICK: i32 = 200_311;

/// A decoded write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum SimOp {
    Approve {
        token: Address,
        spender: Address,
    },
    Burn {
        id: PositionId,
        liquidity: u128,
        amount0_min: U256,
        amount1_min: U256,
        recipient: Address,
    },
    Swap {
        token_in: Address,
        token_out: Address,
        kind: TradeKind,
        amount: U256,
        limit: U256,
        recipient: Address,
    },
    Mint {
        tick_lower: i32,
        tick_upper: i32,
        amount0_desired: U256,
        amount1_desired: U256,
        amount0_min: U256,
        amount1_min: U256,
        recipient: Address,
    },
}

fn address(value: &str) -> Address {
    value.parse().unwrap()
}

/// Encodes every write as JSON calldata.
struct SimEncoder;

impl SimEncoder {
    fn call(to: Address, op: &SimOp) -> Call {
        Call {
            to,
            data: serde_json::to_vec(op).unwrap(),
            value: U256::zero(),
        }
    }
}

impl CallEncoder for SimEncoder {
    fn position_manager(&self) -> Address {
        address(MANAGER)
    }

    fn swap_router(&self) -> Address {
        address(ROUTER)
    }

    fn approve(&self, token: &Address, spender: &Address) -> Call {
        Self::call(
            *token,
            &SimOp::Approve {
                token: *token,
                spender: *spender,
            },
        )
    }

    fn burn(&self, request: &BurnRequest) -> Call {
        Self::call(
            self.position_manager(),
            &SimOp::Burn {
                id: request.id,
                liquidity: request.liquidity,
                amount0_min: request.amount0_min,
                amount1_min: request.amount1_min,
                recipient: request.recipient,
            },
        )
    }

    fn swap(&self, request: &SwapRequest) -> Call {
        Self::call(
            self.swap_router(),
            &SimOp::Swap {
                token_in: request.token_in,
                token_out: request.token_out,
                kind: request.kind,
                amount: request.amount,
                limit: request.limit,
                recipient: request.recipient,
            },
        )
    }

    fn mint(&self, request: &MintRequest) -> Call {
        Self::call(
            self.position_manager(),
            &SimOp::Mint {
                tick_lower: request.tick_lower,
                tick_upper: request.tick_upper,
                amount0_desired: request.amount0_desired,
                amount1_desired: request.amount1_desired,
                amount0_min: request.amount0_min,
                amount1_min: request.amount1_min,
                recipient: request.recipient,
            },
        )
    }
}

struct SimState {
    tick: i32,
    sqrt_price_x96: U256,
    balances: HashMap<Address, U256>,
    allowances: HashSet<(Address, Address)>,
    positions: Vec<PositionData>,
    next_id: u64,
    block: u64,
    ops: Vec<SimOp>,
    submitted: Vec<TxRequest>,
    receipts: HashMap<H256, Option<Receipt>>,
    failing_reads: usize,
    failing_allowance_reads: usize,
    revert_in: Option<usize>,
}

struct SimInner {
    usdc: Token,
    weth: Token,
    state: Mutex<SimState>,
}

impl SimInner {
    fn read(&self) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(GatewayError::Transport(TransportErrorKind::custom_str(
                "simulated outage",
            )));
        }
        Ok(())
    }

    fn pool(&self) -> Pool {
        let state = self.state.lock().unwrap();
        Pool::new(
            address(POOL),
            self.usdc.clone(),
            self.weth.clone(),
            FeeTier::Medium,
            state.sqrt_price_x96,
            state.tick,
            10u128.pow(18),
        )
        .unwrap()
    }

    /// `amount` of `from` expressed in the other pool token at the pool price.
    fn convert(&self, amount: U256, from: &Address, round_up: bool) -> U256 {
        let price = self.pool().price().unwrap();
        let value = if *from == self.usdc.address {
            u256_to_ratio(amount) * price.as_ratio()
        } else {
            u256_to_ratio(amount) / price.as_ratio()
        };
        if round_up {
            ceil_to_u256(&value).unwrap()
        } else {
            floor_to_u256(&value).unwrap()
        }
    }

    fn apply(&self, op: &SimOp, owner: Address) -> Option<Vec<Log>> {
        let pool = self.pool();
        let mut state = self.state.lock().unwrap();
        let balance = |state: &SimState, token: &Address| {
            state.balances.get(token).copied().unwrap_or_default()
        };

        match op {
            SimOp::Approve { token, spender } => {
                state.allowances.insert((*token, *spender));
                Some(Vec::new())
            }
            SimOp::Burn {
                id,
                liquidity,
                amount0_min,
                amount1_min,
                recipient,
            } => {
                let index = state.positions.iter().position(|p| p.id == *id)?;
                let data = state.positions[index].clone();
                if data.liquidity == 0 || data.liquidity != *liquidity || *recipient != owner {
                    return None;
                }
                let (amount0, amount1) = get_amounts_for_liquidity(
                    &pool.sqrt_price(),
                    &sqrt_ratio_at_tick(data.tick_lower).unwrap(),
                    &sqrt_ratio_at_tick(data.tick_upper).unwrap(),
                    data.liquidity,
                )
                .unwrap();
                let amount0 = bigint_to_u256(&amount0).unwrap();
                let amount1 = bigint_to_u256(&amount1).unwrap();
                if amount0 < *amount0_min || amount1 < *amount1_min {
                    return None;
                }
                let b0 = balance(&*state, &data.token0) + amount0;
                let b1 = balance(&*state, &data.token1) + amount1;
                state.balances.insert(data.token0, b0);
                state.balances.insert(data.token1, b1);
                state.positions[index].liquidity = 0;
                Some(Vec::new())
            }
            SimOp::Swap {
                token_in,
                token_out,
                kind,
                amount,
                limit,
                recipient,
            } => {
                drop(state);
                let (amount_in, amount_out) = match kind {
                    TradeKind::ExactInput => {
                        let out = self.convert(*amount, token_in, false);
                        if out < *limit {
                            return None;
                        }
                        (*amount, out)
                    }
                    TradeKind::ExactOutput => {
                        let needed = self.convert(*amount, token_out, true);
                        if needed > *limit {
                            return None;
                        }
                        (needed, *amount)
                    }
                };
                let mut state = self.state.lock().unwrap();
                let held_in = balance(&*state, token_in);
                if held_in < amount_in || *recipient != owner {
                    return None;
                }
                let held_out = balance(&*state, token_out);
                state.balances.insert(*token_in, held_in - amount_in);
                state.balances.insert(*token_out, held_out + amount_out);
                Some(Vec::new())
            }
            SimOp::Mint {
                tick_lower,
                tick_upper,
                amount0_desired,
                amount1_desired,
                amount0_min,
                amount1_min,
                recipient,
            } => {
                let sqrt_lower = sqrt_ratio_at_tick(*tick_lower).unwrap();
                let sqrt_upper = sqrt_ratio_at_tick(*tick_upper).unwrap();
                let liquidity = get_max_liquidity_for_amounts(
                    &pool.sqrt_price(),
                    &sqrt_lower,
                    &sqrt_upper,
                    &u256_to_bigint(*amount0_desired),
                    &u256_to_bigint(*amount1_desired),
                )
                .ok()?;
                let (used0, used1) = get_amounts_for_liquidity(
                    &pool.sqrt_price(),
                    &sqrt_lower,
                    &sqrt_upper,
                    liquidity,
                )
                .ok()?;
                let used0 = bigint_to_u256(&used0).ok()?;
                let used1 = bigint_to_u256(&used1).ok()?;
                let held0 = balance(&*state, &self.usdc.address);
                let held1 = balance(&*state, &self.weth.address);
                if liquidity == 0
                    || used0 < *amount0_min
                    || used1 < *amount1_min
                    || held0 < used0
                    || held1 < used1
                {
                    return None;
                }
                state.balances.insert(self.usdc.address, held0 - used0);
                state.balances.insert(self.weth.address, held1 - used1);

                let id = PositionId::from(state.next_id);
                state.next_id += 1;
                state.positions.push(PositionData {
                    id,
                    token0: self.usdc.address,
                    token1: self.weth.address,
                    fee: FeeTier::Medium.fee(),
                    tick_lower: *tick_lower,
                    tick_upper: *tick_upper,
                    liquidity,
                });
                Some(vec![transfer_log(
                    address(MANAGER),
                    Address::zero(),
                    *recipient,
                    id.0,
                )])
            }
        }
    }
}

#[async_trait]
impl ChainGateway for SimInner {
    async fn get_pool_state(&self, pair: &PairSpec) -> Result<Pool, GatewayError> {
        self.read()?;
        let pool = self.pool();
        if !pair.matches(&pool.token0.address, &pool.token1.address, pool.fee.fee()) {
            return Err(GatewayError::NotFound(format!("pool for {pair}")));
        }
        Ok(pool)
    }

    async fn get_position(&self, id: &PositionId) -> Result<PositionData, GatewayError> {
        self.read()?;
        let state = self.state.lock().unwrap();
        state
            .positions
            .iter()
            .find(|p| p.id == *id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("position {id}")))
    }

    async fn owned_position_count(&self, _owner: &Address) -> Result<u64, GatewayError> {
        self.read()?;
        Ok(self.state.lock().unwrap().positions.len() as u64)
    }

    async fn position_id_at(
        &self,
        _owner: &Address,
        index: u64,
    ) -> Result<PositionId, GatewayError> {
        self.read()?;
        let state = self.state.lock().unwrap();
        state
            .positions
            .get(index as usize)
            .map(|p| p.id)
            .ok_or_else(|| GatewayError::NotFound(format!("owned index {index}")))
    }

    async fn balance_of(&self, _owner: &Address, token: &Token) -> Result<U256, GatewayError> {
        self.read()?;
        let state = self.state.lock().unwrap();
        Ok(state.balances.get(&token.address).copied().unwrap_or_default())
    }

    async fn allowance(
        &self,
        _owner: &Address,
        token: &Token,
        spender: &Address,
    ) -> Result<U256, GatewayError> {
        self.read()?;
        let mut state = self.state.lock().unwrap();
        if state.failing_allowance_reads > 0 {
            state.failing_allowance_reads -= 1;
            return Err(GatewayError::Transport(TransportErrorKind::custom_str(
                "simulated allowance outage",
            )));
        }
        if state.allowances.contains(&(token.address, *spender)) {
            Ok(U256::MAX)
        } else {
            Ok(U256::zero())
        }
    }

    async fn submit(&self, tx: &TxRequest) -> Result<TxHash, GatewayError> {
        let op: SimOp = serde_json::from_slice(&tx.call.data)
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let revert = {
            let mut state = self.state.lock().unwrap();
            state.submitted.push(tx.clone());
            match state.revert_in {
                Some(0) => {
                    state.revert_in = None;
                    true
                }
                Some(n) => {
                    state.revert_in = Some(n - 1);
                    false
                }
                None => false,
            }
        };

        let logs = if revert { None } else { self.apply(&op, tx.from) };

        let mut state = self.state.lock().unwrap();
        state.block += 1;
        let hash = H256::from_low_u64_be(state.block);
        let receipt = logs.map(|logs| {
            state.ops.push(op);
            Receipt {
                tx_hash: TxHash(hash),
                block_number: state.block,
                logs,
            }
        });
        state.receipts.insert(hash, receipt);
        Ok(TxHash(hash))
    }

    async fn confirm(&self, hash: &TxHash, _confirmations: u64) -> Result<Receipt, GatewayError> {
        let state = self.state.lock().unwrap();
        match state.receipts.get(&hash.0) {
            Some(Some(receipt)) => Ok(receipt.clone()),
            Some(None) => Err(GatewayError::Reverted {
                hash: hash.to_string(),
            }),
            None => Err(GatewayError::NotFound(format!("receipt {hash}"))),
        }
    }
}

#[async_trait]
impl QuoteOracle for SimInner {
    async fn quote_exact_input(
        &self,
        token_in: &Address,
        _token_out: &Address,
        _fee: u32,
        amount_in: U256,
    ) -> Result<U256, GatewayError> {
        self.read()?;
        Ok(self.convert(amount_in, token_in, false))
    }

    async fn quote_exact_output(
        &self,
        _token_in: &Address,
        token_out: &Address,
        _fee: u32,
        amount_out: U256,
    ) -> Result<U256, GatewayError> {
        self.read()?;
        Ok(self.convert(amount_out, token_out, true))
    }
}

#[async_trait]
impl GasOracle for SimInner {
    async fn gas_price(&self) -> Result<U256, GatewayError> {
        Ok(U256::from(30_000_000_000u64))
    }
}

/// History store whose appends always fail.
pub(crate) struct FailingHistoryStore;

#[async_trait]
impl HistoryStore for FailingHistoryStore {
    async fn append(&self, _entry: &PositionHistoryEntry) -> Result<(), HistoryError> {
        Err(HistoryError::Io(std::io::Error::other("disk full")))
    }

    async fn load_all(&self) -> Result<Vec<PositionHistoryEntry>, HistoryError> {
        Ok(Vec::new())
    }
}

/// Handle on a simulated USDC/WETH 0.3% pool and one owner account.
pub(crate) struct SimulatedChain {
    inner: Arc<SimInner>,
    history: Arc<InMemoryHistoryStore>,
}

impl SimulatedChain {
    /// 10 000 USDC and 5 WETH at about 2000 USDC per WETH, no positions.
    pub(crate) fn new() -> Self {
        let usdc = Token::new(address(USDC), "USDC", 6);
        let weth = Token::new(address(WETH), "WETH", 18);
        let mut balances = HashMap::new();
        balances.insert(usdc.address, U256::from(10_000_000_000u64));
        balances.insert(weth.address, U256::from(5u64) * U256::exp10(18));

        let state = SimState {
            tick: START_TICK,
            sqrt_price_x96: bigint_to_u256(&sqrt_ratio_at_tick(START_TICK).unwrap()).unwrap(),
            balances,
            allowances: HashSet::new(),
            positions: Vec::new(),
            next_id: 1,
            block: 0,
            ops: Vec::new(),
            submitted: Vec::new(),
            receipts: HashMap::new(),
            failing_reads: 0,
            failing_allowance_reads: 0,
            revert_in: None,
        };
        Self {
            inner: Arc::new(SimInner {
                usdc,
                weth,
                state: Mutex::new(state),
            }),
            history: Arc::new(InMemoryHistoryStore::new()),
        }
    }

    pub(crate) fn gateway(&self) -> Arc<dyn ChainGateway> {
        self.inner.clone()
    }

    pub(crate) fn encoder(&self) -> Arc<dyn CallEncoder> {
        Arc::new(SimEncoder)
    }

    pub(crate) fn transaction_manager(&self, config: TransactionConfig) -> TransactionManager {
        TransactionManager::new(self.inner.clone(), self.inner.clone(), self.owner(), config)
    }

    /// Executor with a 2% band and a 2 WETH reserve.
    pub(crate) fn executor(&self) -> RebalanceExecutor {
        self.executor_with_history(self.history.clone())
    }

    pub(crate) fn executor_with_history(
        &self,
        history: Arc<dyn HistoryStore>,
    ) -> RebalanceExecutor {
        let reserve = NativeReserve::new(self.weth().address, U256::from(2u64) * U256::exp10(18));
        RebalanceExecutor::new(
            self.inner.clone(),
            self.inner.clone(),
            self.encoder(),
            Arc::new(self.transaction_manager(TransactionConfig::default())),
            history,
            Arc::default(),
            PriceRangeCalculator::new(Percentage::from_percent(dec!(2))).unwrap(),
            BalanceEqualizer::new(reserve),
            RebalanceConfig::default(),
        )
    }

    pub(crate) fn owner(&self) -> Address {
        address(OWNER)
    }

    pub(crate) fn router(&self) -> Address {
        address(ROUTER)
    }

    pub(crate) fn usdc(&self) -> Token {
        self.inner.usdc.clone()
    }

    pub(crate) fn weth(&self) -> Token {
        self.inner.weth.clone()
    }

    pub(crate) fn pair(&self) -> PairSpec {
        PairSpec::new(address(WETH), address(USDC), FeeTier::Medium).unwrap()
    }

    pub(crate) fn pool(&self) -> Pool {
        self.inner.pool()
    }

    pub(crate) fn set_balance(&self, token: Address, amount: U256) {
        self.inner
            .state
            .lock()
            .unwrap()
            .balances
            .insert(token, amount);
    }

    pub(crate) fn set_tick(&self, tick: i32) {
        let mut state = self.inner.state.lock().unwrap();
        state.tick = tick;
        state.sqrt_price_x96 = bigint_to_u256(&sqrt_ratio_at_tick(tick).unwrap()).unwrap();
    }

    pub(crate) fn move_tick(&self, delta: i32) {
        let tick = self.inner.state.lock().unwrap().tick;
        self.set_tick(tick + delta);
    }

    /// Adds an owned USDC/WETH position without touching balances.
    pub(crate) fn seed_position(
        &self,
        fee: FeeTier,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
    ) -> PositionId {
        let mut state = self.inner.state.lock().unwrap();
        let id = PositionId::from(state.next_id);
        state.next_id += 1;
        state.positions.push(PositionData {
            id,
            token0: self.inner.usdc.address,
            token1: self.inner.weth.address,
            fee: fee.fee(),
            tick_lower,
            tick_upper,
            liquidity,
        });
        id
    }

    /// The next `count` reads fail.
    pub(crate) fn fail_reads(&self, count: usize) {
        self.inner.state.lock().unwrap().failing_reads = count;
    }

    /// The next `count` allowance reads fail.
    pub(crate) fn fail_allowance_reads(&self, count: usize) {
        self.inner.state.lock().unwrap().failing_allowance_reads = count;
    }

    /// The write after the next `skip` writes reverts.
    pub(crate) fn revert_write(&self, skip: usize) {
        self.inner.state.lock().unwrap().revert_in = Some(skip);
    }

    pub(crate) fn revert_next_write(&self) {
        self.revert_write(0);
    }

    /// Writes applied so far, in order. Reverted writes are not included.
    pub(crate) fn ops(&self) -> Vec<SimOp> {
        self.inner.state.lock().unwrap().ops.clone()
    }

    pub(crate) fn submitted(&self) -> Vec<TxRequest> {
        self.inner.state.lock().unwrap().submitted.clone()
    }

    pub(crate) fn live_position_count(&self) -> usize {
        let state = self.inner.state.lock().unwrap();
        state.positions.iter().filter(|p| p.liquidity > 0).count()
    }

    pub(crate) async fn history_len(&self) -> usize {
        self.history.len().await
    }

    pub(crate) async fn history_entries(&self) -> Vec<PositionHistoryEntry> {
        self.history.load_all().await.unwrap()
    }
}
