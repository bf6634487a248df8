//! Uniswap v3 reads, quotes and transaction handling through an alloy provider.

use crate::convert::{
    from_alloy_address, from_alloy_u256, from_b256, to_alloy_address, to_alloy_u256, to_b256,
};
use crate::error::GatewayError;
use crate::gateway::{ChainGateway, Log, PositionData, QuoteOracle, Receipt, TxHash, TxRequest};
use crate::uniswap::contracts::{
    IERC20, IERC20Bytes32, INonfungiblePositionManager as Manager, IQuoter, IUniswapV3Factory,
    IUniswapV3Pool, UniswapAddresses,
};
use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::aliases::{U24, U160};
use alloy::primitives::{self, Bytes};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use primitive_types::U256;
use rangekeeper_domain::entities::{PairSpec, Pool, PositionId, Token};
use rangekeeper_domain::value_objects::Address;
use std::time::Duration;
use tracing::{debug, info};

/// `ChainGateway` and `QuoteOracle` for a Uniswap v3 deployment.
pub struct UniswapGateway {
    /// Node connection.
    provider: DynProvider,
    /// Contract addresses.
    addresses: UniswapAddresses,
    /// Delay between receipt polls.
    receipt_poll: Duration,
}

impl UniswapGateway {
    /// Creates a new gateway.
    pub fn new(provider: DynProvider, addresses: UniswapAddresses, receipt_poll: Duration) -> Self {
        Self {
            provider,
            addresses,
            receipt_poll,
        }
    }

    pub fn addresses(&self) -> &UniswapAddresses {
        &self.addresses
    }

    /// `eth_call` of `call` on `to`, decoded with the call's return type.
    async fn call<C: SolCall>(&self, to: &Address, call: C) -> Result<C::Return, GatewayError> {
        let request = TransactionRequest::default()
            .with_to(to_alloy_address(to))
            .with_input(Bytes::from(call.abi_encode()));
        let raw = self.provider.call(request).await?;
        Ok(C::abi_decode_returns(&raw)?)
    }

    /// ERC-20 symbol and decimals. Handles `bytes32` symbols.
    pub async fn token(&self, address: &Address) -> Result<Token, GatewayError> {
        let decimals = self.call(address, IERC20::decimalsCall).await?;
        let symbol = match self.call(address, IERC20::symbolCall).await {
            Ok(symbol) => symbol,
            Err(GatewayError::Decode(_)) => {
                let raw = self.call(address, IERC20Bytes32::symbolCall).await?;
                String::from_utf8_lossy(raw.as_slice())
                    .trim_end_matches('\0')
                    .to_string()
            }
            Err(e) => return Err(e),
        };
        Ok(Token::new(*address, symbol, decimals))
    }

    async fn pool_address(&self, pair: &PairSpec) -> Result<Address, GatewayError> {
        let pool = self
            .call(
                &self.addresses.factory,
                IUniswapV3Factory::getPoolCall {
                    tokenA: to_alloy_address(&pair.token0),
                    tokenB: to_alloy_address(&pair.token1),
                    fee: U24::saturating_from(pair.fee.fee()),
                },
            )
            .await?;
        if pool.is_zero() {
            return Err(GatewayError::NotFound(format!("pool for {pair}")));
        }
        Ok(from_alloy_address(pool))
    }
}

#[async_trait]
impl ChainGateway for UniswapGateway {
    async fn get_pool_state(&self, pair: &PairSpec) -> Result<Pool, GatewayError> {
        let address = self.pool_address(pair).await?;
        let slot0 = self.call(&address, IUniswapV3Pool::slot0Call).await?;
        let liquidity = self.call(&address, IUniswapV3Pool::liquidityCall).await?;
        let tick = slot0.tick.as_i32();

        let token0 = self.token(&pair.token0).await?;
        let token1 = self.token(&pair.token1).await?;
        debug!(pool = %address, tick, liquidity, "Read pool state");

        Ok(Pool::new(
            address,
            token0,
            token1,
            pair.fee,
            from_alloy_u256(primitives::U256::from(slot0.sqrtPriceX96)),
            tick,
            liquidity,
        )?)
    }

    async fn get_position(&self, id: &PositionId) -> Result<PositionData, GatewayError> {
        let position = self
            .call(
                &self.addresses.position_manager,
                Manager::positionsCall {
                    tokenId: to_alloy_u256(id.0),
                },
            )
            .await?;
        Ok(PositionData {
            id: *id,
            token0: from_alloy_address(position.token0),
            token1: from_alloy_address(position.token1),
            fee: position.fee.to::<u32>(),
            tick_lower: position.tickLower.as_i32(),
            tick_upper: position.tickUpper.as_i32(),
            liquidity: position.liquidity,
        })
    }

    async fn owned_position_count(&self, owner: &Address) -> Result<u64, GatewayError> {
        let count = self
            .call(
                &self.addresses.position_manager,
                Manager::balanceOfCall {
                    owner: to_alloy_address(owner),
                },
            )
            .await?;
        u64::try_from(count)
            .map_err(|_| GatewayError::Decode(format!("{owner} owns {count} positions")))
    }

    async fn position_id_at(
        &self,
        owner: &Address,
        index: u64,
    ) -> Result<PositionId, GatewayError> {
        let id = self
            .call(
                &self.addresses.position_manager,
                Manager::tokenOfOwnerByIndexCall {
                    owner: to_alloy_address(owner),
                    index: primitives::U256::from(index),
                },
            )
            .await?;
        Ok(PositionId(from_alloy_u256(id)))
    }

    async fn balance_of(&self, owner: &Address, token: &Token) -> Result<U256, GatewayError> {
        if token.address == self.addresses.wrapped_native {
            let balance = self.provider.get_balance(to_alloy_address(owner)).await?;
            return Ok(from_alloy_u256(balance));
        }
        let balance = self
            .call(
                &token.address,
                IERC20::balanceOfCall {
                    owner: to_alloy_address(owner),
                },
            )
            .await?;
        Ok(from_alloy_u256(balance))
    }

    async fn allowance(
        &self,
        owner: &Address,
        token: &Token,
        spender: &Address,
    ) -> Result<U256, GatewayError> {
        let allowance = self
            .call(
                &token.address,
                IERC20::allowanceCall {
                    owner: to_alloy_address(owner),
                    spender: to_alloy_address(spender),
                },
            )
            .await?;
        Ok(from_alloy_u256(allowance))
    }

    /// Hands the transaction to the node, which signs it with the `from`
    /// account.
    async fn submit(&self, tx: &TxRequest) -> Result<TxHash, GatewayError> {
        if tx.gas_price > U256::from(u128::MAX) {
            return Err(GatewayError::Decode(format!(
                "gas price {} does not fit in 128 bits",
                tx.gas_price
            )));
        }
        let request = TransactionRequest::default()
            .with_from(to_alloy_address(&tx.from))
            .with_to(to_alloy_address(&tx.call.to))
            .with_input(Bytes::from(tx.call.data.clone()))
            .with_value(to_alloy_u256(tx.call.value))
            .with_gas_limit(tx.gas_limit)
            .with_gas_price(tx.gas_price.low_u128());
        let pending = self.provider.send_transaction(request).await?;
        let hash = TxHash(from_b256(*pending.tx_hash()));
        info!(tx = %hash, to = %tx.call.to, "Transaction submitted");
        Ok(hash)
    }

    async fn confirm(&self, hash: &TxHash, confirmations: u64) -> Result<Receipt, GatewayError> {
        let confirmations = confirmations.max(1);
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(to_b256(&hash.0))
                .await?;
            if let Some(receipt) = receipt
                && let Some(block_number) = receipt.block_number()
            {
                if !receipt.status() {
                    return Err(GatewayError::Reverted {
                        hash: hash.to_string(),
                    });
                }
                let head = self.provider.get_block_number().await?;
                let depth = head.saturating_sub(block_number) + 1;
                if depth >= confirmations {
                    debug!(tx = %hash, block = block_number, depth, "Transaction confirmed");
                    let logs = receipt
                        .logs()
                        .iter()
                        .map(|log| Log {
                            address: from_alloy_address(log.address()),
                            topics: log.topics().iter().copied().map(from_b256).collect(),
                            data: log.data().data.to_vec(),
                        })
                        .collect();
                    return Ok(Receipt {
                        tx_hash: *hash,
                        block_number,
                        logs,
                    });
                }
            }
            tokio::time::sleep(self.receipt_poll).await;
        }
    }
}

#[async_trait]
impl QuoteOracle for UniswapGateway {
    async fn quote_exact_input(
        &self,
        token_in: &Address,
        token_out: &Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<U256, GatewayError> {
        let amount_out = self
            .call(
                &self.addresses.quoter,
                IQuoter::quoteExactInputSingleCall {
                    tokenIn: to_alloy_address(token_in),
                    tokenOut: to_alloy_address(token_out),
                    fee: U24::saturating_from(fee),
                    amountIn: to_alloy_u256(amount_in),
                    sqrtPriceLimitX96: U160::ZERO,
                },
            )
            .await?;
        Ok(from_alloy_u256(amount_out))
    }

    async fn quote_exact_output(
        &self,
        token_in: &Address,
        token_out: &Address,
        fee: u32,
        amount_out: U256,
    ) -> Result<U256, GatewayError> {
        let amount_in = self
            .call(
                &self.addresses.quoter,
                IQuoter::quoteExactOutputSingleCall {
                    tokenIn: to_alloy_address(token_in),
                    tokenOut: to_alloy_address(token_out),
                    fee: U24::saturating_from(fee),
                    amountOut: to_alloy_u256(amount_out),
                    sqrtPriceLimitX96: U160::ZERO,
                },
            )
            .await?;
        Ok(from_alloy_u256(amount_in))
    }
}
