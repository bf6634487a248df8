//! Connection to an EVM node.

use crate::error::GatewayError;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::http::reqwest::Url;

pub use alloy::providers::DynProvider;

/// HTTP provider without transaction fillers. The node signs, so it also
/// assigns the nonce.
pub fn connect(url: &str) -> Result<DynProvider, GatewayError> {
    let url: Url = url
        .parse()
        .map_err(|e| GatewayError::Decode(format!("invalid RPC url {url}: {e}")))?;
    Ok(ProviderBuilder::new()
        .disable_recommended_fillers()
        .connect_http(url)
        .erased())
}
