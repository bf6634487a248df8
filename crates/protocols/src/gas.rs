//! Gas price oracles.

use crate::error::GatewayError;
use crate::gateway::GasOracle;
use crate::convert::from_alloy_u256;
use alloy::primitives;
use alloy::providers::{DynProvider, Provider};
use async_trait::async_trait;
use primitive_types::U256;
use rangekeeper_domain::value_objects::TokenAmount;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

/// Gas station response, prices in gwei.
#[derive(Debug, Deserialize)]
struct GasPriceData {
    fastest: Decimal,
}

/// Reads the `fastest` gwei price from an HTTP gas station.
pub struct HttpGasOracle {
    client: reqwest::Client,
    url: String,
}

impl HttpGasOracle {
    /// Creates a new oracle polling `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

fn gwei_to_wei(gwei: Decimal) -> Result<U256, GatewayError> {
    Ok(TokenAmount::from_decimal(gwei, 9)?.as_u256())
}

#[async_trait]
impl GasOracle for HttpGasOracle {
    async fn gas_price(&self) -> Result<U256, GatewayError> {
        let data: GasPriceData = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(gwei = %data.fastest, "Gas station price");
        gwei_to_wei(data.fastest)
    }
}

/// Uses the node's `eth_gasPrice`.
pub struct RpcGasOracle {
    provider: DynProvider,
}

impl RpcGasOracle {
    /// Creates a new oracle over `provider`.
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl GasOracle for RpcGasOracle {
    async fn gas_price(&self) -> Result<U256, GatewayError> {
        let price = self.provider.get_gas_price().await?;
        Ok(from_alloy_u256(primitives::U256::from(price)))
    }
}
