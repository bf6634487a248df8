//! Command Line Interface for rangekeeper.
mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{ChainArgs, RunArgs, StrategyArgs};
use dotenv::dotenv;
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rangekeeper")]
#[command(about = "Keeps a Uniswap v3 liquidity position centered on the market price", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rebalancing loop
    Run(RunArgs),
    /// Show pool, balances and owned positions
    Status {
        #[command(flatten)]
        chain: ChainArgs,

        #[command(flatten)]
        strategy: StrategyArgs,
    },
    /// Compute a band and its ticks offline
    Range {
        /// Price of token0 in token1
        #[arg(short, long)]
        price: Decimal,

        /// Band width in percent
        #[arg(short, long, env = "PRICE_WIDTH", default_value = "2")]
        width: Decimal,

        /// Fee tier in hundredths of a bip (100, 500, 3000, 10000)
        #[arg(short, long, default_value_t = 3000)]
        fee: u32,

        /// Token0 decimals
        #[arg(long, default_value_t = 0)]
        decimals0: u8,

        /// Token1 decimals
        #[arg(long, default_value_t = 0)]
        decimals1: u8,
    },
    /// Print the history file
    History {
        #[arg(long, env = "HISTORY_FILE", default_value = "history.json")]
        history_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run(args).await?,
        Commands::Status { chain, strategy } => commands::status(chain, strategy).await?,
        Commands::Range {
            price,
            width,
            fee,
            decimals0,
            decimals1,
        } => commands::range(price, width, fee, decimals0, decimals1)?,
        Commands::History { history_file } => commands::history(&history_file).await?,
    }

    Ok(())
}
