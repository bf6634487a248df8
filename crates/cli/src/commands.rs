//! Subcommand implementations.

use crate::config::{ChainArgs, ChainSettings, RunArgs, StrategyArgs, calculator};
use anyhow::{Context, Result};
use prettytable::{Table, row};
use rangekeeper_data::{HistoryStore, JsonFileHistoryStore};
use rangekeeper_domain::entities::{Pool, Position, is_in_range};
use rangekeeper_domain::equalizer::BalanceEqualizer;
use rangekeeper_domain::fees::FeeTier;
use rangekeeper_domain::history::PRICE_SCALE;
use rangekeeper_domain::math::price_tick::tick_to_price;
use rangekeeper_domain::range::align_to_ticks;
use rangekeeper_domain::value_objects::{Price, TokenAmount};
use rangekeeper_execution::lifecycle::LifecycleTracker;
use rangekeeper_execution::strategy::{
    ControllerConfig, PositionLifecycleController, RebalanceConfig, RebalanceExecutor,
};
use rangekeeper_execution::sync::PositionScanner;
use rangekeeper_execution::transaction::TransactionManager;
use rangekeeper_protocols::gas::{HttpGasOracle, RpcGasOracle};
use rangekeeper_protocols::rpc::{self, DynProvider};
use rangekeeper_protocols::uniswap::{UniswapCallEncoder, UniswapGateway};
use rangekeeper_protocols::{ChainGateway, GasOracle};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

fn connect(settings: &ChainSettings) -> Result<(DynProvider, Arc<UniswapGateway>)> {
    let provider = rpc::connect(&settings.rpc_url)?;
    let gateway = Arc::new(UniswapGateway::new(
        provider.clone(),
        settings.addresses,
        settings.receipt_poll,
    ));
    Ok((provider, gateway))
}

/// Human price of token0 in token1.
fn human(price: &Price, pool: &Pool) -> Result<Decimal> {
    Ok(price.to_decimal(pool.token0.decimals, pool.token1.decimals, PRICE_SCALE)?)
}

/// Runs the control loop until Ctrl-C or a fatal error.
pub async fn run(args: RunArgs) -> Result<()> {
    let settings = args.validate()?;
    let (provider, gateway) = connect(&settings.chain)?;

    let gas: Arc<dyn GasOracle> = match &settings.gas_oracle_url {
        Some(url) => Arc::new(HttpGasOracle::new(url.clone())),
        None => Arc::new(RpcGasOracle::new(provider)),
    };
    let encoder = Arc::new(UniswapCallEncoder::new(settings.chain.addresses));
    let tx_manager = Arc::new(TransactionManager::new(
        gateway.clone(),
        gas,
        settings.owner,
        settings.transactions,
    ));
    let history = Arc::new(JsonFileHistoryStore::new(settings.history_file.clone()));
    let reserve = settings
        .strategy
        .reserve(settings.chain.addresses.wrapped_native);

    let executor = RebalanceExecutor::new(
        gateway.clone(),
        gateway.clone(),
        encoder,
        tx_manager,
        history,
        Arc::new(LifecycleTracker::new()),
        settings.strategy.calculator,
        BalanceEqualizer::new(reserve),
        RebalanceConfig::default(),
    );
    let mut controller = PositionLifecycleController::new(
        gateway,
        executor,
        ControllerConfig::new(settings.chain.pair).with_poll_interval(settings.poll_interval),
    );

    info!(
        owner = %settings.owner,
        pair = %settings.chain.pair,
        width = %settings.strategy.calculator.width(),
        reserve = %reserve.amount,
        history = %settings.history_file.display(),
        "Starting rangekeeper"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested, finishing current cycle"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, stopping"),
        }
        let _ = shutdown_tx.send(true);
    });

    controller.run(shutdown_rx).await?;
    Ok(())
}

/// Prints pool, balances, owned positions and the band a mint would use now.
pub async fn status(chain: ChainArgs, strategy: StrategyArgs) -> Result<()> {
    let settings = chain.validate()?;
    let owner = settings.owner()?;
    let strategy = strategy.validate()?;
    let (_, gateway) = connect(&settings)?;

    let pool = Arc::new(gateway.get_pool_state(&settings.pair).await?);
    let current = pool.price()?;

    let mut table = Table::new();
    table.add_row(row!["Pool", pool.address]);
    table.add_row(row!["Pair", format!("{}/{}", pool.token0, pool.token1)]);
    table.add_row(row!["Fee", pool.fee]);
    table.add_row(row!["Tick", pool.tick]);
    table.add_row(row![
        format!("Price ({} per {})", pool.token1, pool.token0),
        human(&current, &pool)?
    ]);
    for token in [&pool.token0, &pool.token1] {
        let balance = gateway.balance_of(&owner, token).await?;
        table.add_row(row![
            format!("Balance {token}"),
            TokenAmount::new(balance).to_decimal(token.decimals)?
        ]);
    }
    let (_, ticks) = strategy.calculator.band(&pool)?;
    table.add_row(row![
        "Next band",
        format!(
            "{} .. {} (ticks {} .. {})",
            human(&tick_to_price(ticks.tick_lower)?, &pool)?,
            human(&tick_to_price(ticks.tick_upper)?, &pool)?,
            ticks.tick_lower,
            ticks.tick_upper
        )
    ]);
    table.printstd();

    let scanner = PositionScanner::new(gateway.clone());
    let matching = scanner.matching(&owner, &settings.pair).await?;
    if matching.is_empty() {
        println!("No live position for {}", settings.pair);
        return Ok(());
    }
    if matching.len() > 1 {
        println!(
            "Warning: {} live positions match the pair, the controller will refuse to run",
            matching.len()
        );
    }

    let mut positions = Table::new();
    positions.add_row(row!["Id", "Ticks", "Liquidity", "Lower", "Upper", "In range"]);
    for data in matching {
        let position = Position::new(
            pool.clone(),
            data.tick_lower,
            data.tick_upper,
            data.liquidity,
            Some(data.id),
        )?;
        positions.add_row(row![
            data.id,
            format!("{} .. {}", data.tick_lower, data.tick_upper),
            data.liquidity,
            human(&tick_to_price(data.tick_lower)?, &pool)?,
            human(&tick_to_price(data.tick_upper)?, &pool)?,
            is_in_range(&position)?
        ]);
    }
    positions.printstd();
    Ok(())
}

/// Prints the band and ticks for a price without touching the chain.
pub fn range(price: Decimal, width: Decimal, fee: u32, decimals0: u8, decimals1: u8) -> Result<()> {
    let fee = FeeTier::try_from(fee)?;
    let calculator = calculator(width)?;
    let current = Price::from_decimal(price, decimals0, decimals1)?;
    let band = calculator.calculate(&current)?;
    let ticks = align_to_ticks(&band, fee.tick_spacing())?;

    let show = |p: &Price| p.to_decimal(decimals0, decimals1, PRICE_SCALE);
    let mut table = Table::new();
    table.add_row(row!["", "Lower", "Upper"]);
    table.add_row(row![
        "Band",
        show(&band.lower_price)?,
        show(&band.upper_price)?
    ]);
    table.add_row(row!["Ticks", ticks.tick_lower, ticks.tick_upper]);
    table.add_row(row![
        "Realized",
        show(&tick_to_price(ticks.tick_lower)?)?,
        show(&tick_to_price(ticks.tick_upper)?)?
    ]);
    table.printstd();
    println!(
        "Fee tier {} (tick spacing {}), width {}%",
        fee,
        fee.tick_spacing(),
        width
    );
    Ok(())
}

/// Prints every record in the history file.
pub async fn history(path: &Path) -> Result<()> {
    let store = JsonFileHistoryStore::new(path);
    let entries = store
        .load_all()
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    if entries.is_empty() {
        println!("No history in {}", path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["Time", "Value (native)", "Value (token)", "Lower", "Upper"]);
    for entry in entries {
        let time = chrono::DateTime::from_timestamp_millis(entry.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| entry.timestamp.to_string());
        table.add_row(row![
            time,
            entry.total_wallet_value_native,
            entry.total_wallet_value_token,
            entry.lower_price,
            entry.upper_price
        ]);
    }
    table.printstd();
    Ok(())
}
