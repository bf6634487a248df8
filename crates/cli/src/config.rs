//! Command line and environment configuration.
//!
//! Every flag falls back to an environment variable, and `.env` is loaded
//! before parsing. Raw arguments are validated into settings before any
//! chain access.

use clap::Args;
use primitive_types::U256;
use rangekeeper_domain::entities::PairSpec;
use rangekeeper_domain::equalizer::NativeReserve;
use rangekeeper_domain::range::PriceRangeCalculator;
use rangekeeper_domain::value_objects::{Address, Percentage, TokenAmount};
use rangekeeper_execution::transaction::TransactionConfig;
use rangekeeper_protocols::uniswap::UniswapAddresses;
use rangekeeper_protocols::uniswap::contracts::{
    MAINNET_FACTORY, MAINNET_POSITION_MANAGER, MAINNET_QUOTER, MAINNET_SWAP_ROUTER, MAINNET_WETH,
};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// WETH/USDC 0.3% on mainnet.
pub const DEFAULT_PAIR: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2:0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48:3000";

/// Decimals of the chain's native currency.
const NATIVE_DECIMALS: u8 = 18;

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid address: {value}")]
    InvalidAddress { name: &'static str, value: String },
    #[error("invalid pair {value}: {reason}")]
    InvalidPair { value: String, reason: String },
    #[error("price width must be strictly between 0 and 100 percent, got {0}")]
    InvalidWidth(Decimal),
    #[error("native buffer must be a non-negative amount, got {0}")]
    InvalidBuffer(Decimal),
    #[error("WALLET_ADDRESS is required")]
    MissingWallet,
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

/// Connection and contract settings shared by the chain commands.
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// JSON-RPC endpoint. Transactions are signed by this endpoint.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: String,

    /// Account that owns the position and signs transactions.
    #[arg(long, env = "WALLET_ADDRESS")]
    pub wallet_address: Option<String>,

    /// Managed pair as `token0:token1:fee`.
    #[arg(long, env = "UNISWAP_PAIR", default_value = DEFAULT_PAIR)]
    pub pair: String,

    /// Wrapped native token.
    #[arg(long, env = "WRAPPED_NATIVE", default_value = MAINNET_WETH)]
    pub wrapped_native: String,

    /// Uniswap v3 factory.
    #[arg(long, env = "UNISWAP_FACTORY", default_value = MAINNET_FACTORY)]
    pub factory: String,

    /// NonfungiblePositionManager.
    #[arg(long, env = "UNISWAP_POSITIONS", default_value = MAINNET_POSITION_MANAGER)]
    pub positions: String,

    /// SwapRouter.
    #[arg(long, env = "UNISWAP_ROUTER", default_value = MAINNET_SWAP_ROUTER)]
    pub router: String,

    /// Quoter.
    #[arg(long, env = "UNISWAP_QUOTER", default_value = MAINNET_QUOTER)]
    pub quoter: String,

    /// Delay between receipt polls in milliseconds.
    #[arg(long, env = "RECEIPT_POLL_MS", default_value_t = 2000)]
    pub receipt_poll_ms: u64,
}

/// Sizing settings.
#[derive(Args, Debug, Clone)]
pub struct StrategyArgs {
    /// Band width in percent of the current price.
    #[arg(long, env = "PRICE_WIDTH", default_value = "2")]
    pub price_width: Decimal,

    /// Native currency withheld from trading, in whole units.
    #[arg(long, env = "BUFFER_ETHER", default_value = "2")]
    pub buffer_ether: Decimal,
}

/// Control loop settings.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub chain: ChainArgs,

    #[command(flatten)]
    pub strategy: StrategyArgs,

    /// Seconds between cycles.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 300)]
    pub poll_interval_secs: u64,

    /// Confirmations for approvals, burns and mints.
    #[arg(long, env = "CONFIRMATIONS", default_value_t = 1)]
    pub confirmations: u64,

    /// Confirmations for swaps.
    #[arg(long, env = "SWAP_CONFIRMATIONS", default_value_t = 3)]
    pub swap_confirmations: u64,

    /// History file, a JSON array.
    #[arg(long, env = "HISTORY_FILE", default_value = "history.json")]
    pub history_file: PathBuf,

    /// Gas price endpoint returning `{"fastest": gwei}`. Defaults to `eth_gasPrice`.
    #[arg(long, env = "GAS_ORACLE_URL")]
    pub gas_oracle_url: Option<String>,
}

/// Validated chain settings.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub rpc_url: String,
    pub wallet: Option<Address>,
    pub pair: PairSpec,
    pub addresses: UniswapAddresses,
    pub receipt_poll: Duration,
}

impl ChainSettings {
    /// The wallet, which `run` and `status` require.
    pub fn owner(&self) -> Result<Address, ConfigError> {
        self.wallet.ok_or(ConfigError::MissingWallet)
    }
}

/// Validated sizing settings.
#[derive(Debug, Clone)]
pub struct StrategySettings {
    pub calculator: PriceRangeCalculator,
    pub reserve_amount: U256,
}

impl StrategySettings {
    pub fn reserve(&self, wrapped_native: Address) -> NativeReserve {
        NativeReserve::new(wrapped_native, self.reserve_amount)
    }
}

/// Validated control loop settings.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub chain: ChainSettings,
    pub owner: Address,
    pub strategy: StrategySettings,
    pub poll_interval: Duration,
    pub transactions: TransactionConfig,
    pub history_file: PathBuf,
    pub gas_oracle_url: Option<String>,
}

fn parse_address(name: &'static str, value: &str) -> Result<Address, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidAddress {
        name,
        value: value.to_string(),
    })
}

/// Band calculator for a width given in percent.
pub fn calculator(width_percent: Decimal) -> Result<PriceRangeCalculator, ConfigError> {
    PriceRangeCalculator::new(Percentage::from_percent(width_percent))
        .map_err(|_| ConfigError::InvalidWidth(width_percent))
}

impl ChainArgs {
    pub fn validate(&self) -> Result<ChainSettings, ConfigError> {
        let pair = self
            .pair
            .parse::<PairSpec>()
            .map_err(|e| ConfigError::InvalidPair {
                value: self.pair.clone(),
                reason: e.to_string(),
            })?;
        let wallet = self
            .wallet_address
            .as_deref()
            .map(|value| parse_address("WALLET_ADDRESS", value))
            .transpose()?;
        if self.receipt_poll_ms == 0 {
            return Err(ConfigError::Zero {
                name: "RECEIPT_POLL_MS",
            });
        }

        Ok(ChainSettings {
            rpc_url: self.rpc_url.clone(),
            wallet,
            pair,
            addresses: UniswapAddresses {
                factory: parse_address("UNISWAP_FACTORY", &self.factory)?,
                position_manager: parse_address("UNISWAP_POSITIONS", &self.positions)?,
                swap_router: parse_address("UNISWAP_ROUTER", &self.router)?,
                quoter: parse_address("UNISWAP_QUOTER", &self.quoter)?,
                wrapped_native: parse_address("WRAPPED_NATIVE", &self.wrapped_native)?,
            },
            receipt_poll: Duration::from_millis(self.receipt_poll_ms),
        })
    }
}

impl StrategyArgs {
    pub fn validate(&self) -> Result<StrategySettings, ConfigError> {
        let calculator = calculator(self.price_width)?;
        if self.buffer_ether.is_sign_negative() {
            return Err(ConfigError::InvalidBuffer(self.buffer_ether));
        }
        let reserve_amount = TokenAmount::from_decimal(self.buffer_ether, NATIVE_DECIMALS)
            .map_err(|_| ConfigError::InvalidBuffer(self.buffer_ether))?;

        Ok(StrategySettings {
            calculator,
            reserve_amount: reserve_amount.as_u256(),
        })
    }
}

impl RunArgs {
    pub fn validate(&self) -> Result<RunSettings, ConfigError> {
        let chain = self.chain.validate()?;
        let owner = chain.owner()?;
        let strategy = self.strategy.validate()?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Zero {
                name: "POLL_INTERVAL_SECS",
            });
        }

        Ok(RunSettings {
            chain,
            owner,
            strategy,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            transactions: TransactionConfig {
                confirmations: self.confirmations,
                swap_confirmations: self.swap_confirmations,
                ..TransactionConfig::default()
            },
            history_file: self.history_file.clone(),
            gas_oracle_url: self.gas_oracle_url.clone(),
        })
    }
}
