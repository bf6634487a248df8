//! Calldata for the position manager, swap router and ERC-20 approvals.
//!
//! The wrapped native token is handled as the native currency: it is paid
//! with `msg.value` and paid out unwrapped, the same way the Uniswap SDKs do
//! with `useNative`.

use crate::convert::{to_alloy_address, to_alloy_u256};
use crate::gateway::{BurnRequest, Call, CallEncoder, MintRequest, SwapRequest};
use crate::uniswap::contracts::{
    IERC20, INonfungiblePositionManager as Manager, ISwapRouter as Router, UniswapAddresses,
};
use alloy::primitives::aliases::{I24, U24, U160};
use alloy::primitives::{self, Bytes};
use alloy::sol_types::SolCall;
use primitive_types::U256;
use rangekeeper_domain::enums::TradeKind;
use rangekeeper_domain::value_objects::Address;

/// Deadline for every periphery call. Unbounded.
pub const DEADLINE: U256 = U256::MAX;

/// Builds Uniswap v3 periphery calldata.
#[derive(Debug, Clone, Copy)]
pub struct UniswapCallEncoder {
    addresses: UniswapAddresses,
}

impl UniswapCallEncoder {
    /// Creates a new encoder for a deployment.
    pub fn new(addresses: UniswapAddresses) -> Self {
        Self { addresses }
    }

    fn is_native(&self, token: &Address) -> bool {
        *token == self.addresses.wrapped_native
    }
}

/// The single call as is, or all of them through `multicall`.
fn single_or_multicall(to: Address, mut calls: Vec<Vec<u8>>, value: U256) -> Call {
    let data = if calls.len() == 1 {
        calls.remove(0)
    } else {
        Manager::multicallCall {
            data: calls.into_iter().map(Bytes::from).collect(),
        }
        .abi_encode()
    };
    Call { to, data, value }
}

fn fee(fee: u32) -> U24 {
    U24::saturating_from(fee)
}

/// Ticks are validated against `MIN_TICK..=MAX_TICK` before they get here.
fn tick(tick: i32) -> I24 {
    I24::unchecked_from(tick)
}

impl CallEncoder for UniswapCallEncoder {
    fn position_manager(&self) -> Address {
        self.addresses.position_manager
    }

    fn swap_router(&self) -> Address {
        self.addresses.swap_router
    }

    fn approve(&self, token: &Address, spender: &Address) -> Call {
        Call {
            to: *token,
            data: IERC20::approveCall {
                spender: to_alloy_address(spender),
                amount: primitives::U256::MAX,
            }
            .abi_encode(),
            value: U256::zero(),
        }
    }

    /// `decreaseLiquidity` of everything, then `collect` of everything owed.
    /// A native side is collected by the manager and unwrapped to the recipient.
    fn burn(&self, request: &BurnRequest) -> Call {
        let token_id = to_alloy_u256(request.id.0);
        let recipient = to_alloy_address(&request.recipient);
        let decrease = Manager::decreaseLiquidityCall {
            params: Manager::DecreaseLiquidityParams {
                tokenId: token_id,
                liquidity: request.liquidity,
                amount0Min: to_alloy_u256(request.amount0_min),
                amount1Min: to_alloy_u256(request.amount1_min),
                deadline: to_alloy_u256(DEADLINE),
            },
        }
        .abi_encode();

        let native_side = [request.token0, request.token1]
            .into_iter()
            .find(|token| self.is_native(token));
        let collect = Manager::collectCall {
            params: Manager::CollectParams {
                tokenId: token_id,
                // address(0) keeps the tokens in the manager for unwrap and sweep
                recipient: if native_side.is_some() {
                    primitives::Address::ZERO
                } else {
                    recipient
                },
                amount0Max: u128::MAX,
                amount1Max: u128::MAX,
            },
        }
        .abi_encode();

        let mut calls = vec![decrease, collect];
        if let Some(native) = native_side {
            let other = if native == request.token0 {
                request.token1
            } else {
                request.token0
            };
            calls.push(
                Manager::unwrapWETH9Call {
                    amountMinimum: primitives::U256::ZERO,
                    recipient,
                }
                .abi_encode(),
            );
            calls.push(
                Manager::sweepTokenCall {
                    token: to_alloy_address(&other),
                    amountMinimum: primitives::U256::ZERO,
                    recipient,
                }
                .abi_encode(),
            );
        }
        single_or_multicall(self.addresses.position_manager, calls, U256::zero())
    }

    fn swap(&self, request: &SwapRequest) -> Call {
        let native_in = self.is_native(&request.token_in);
        let native_out = self.is_native(&request.token_out);
        let token_in = to_alloy_address(&request.token_in);
        let token_out = to_alloy_address(&request.token_out);
        let owner = to_alloy_address(&request.recipient);
        // address(0) leaves the output with the router for unwrapping
        let recipient = if native_out {
            primitives::Address::ZERO
        } else {
            owner
        };
        let amount = to_alloy_u256(request.amount);
        let limit = to_alloy_u256(request.limit);

        let swap = match request.kind {
            TradeKind::ExactInput => Router::exactInputSingleCall {
                params: Router::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee: fee(request.fee),
                    recipient,
                    deadline: to_alloy_u256(DEADLINE),
                    amountIn: amount,
                    amountOutMinimum: limit,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            }
            .abi_encode(),
            TradeKind::ExactOutput => Router::exactOutputSingleCall {
                params: Router::ExactOutputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee: fee(request.fee),
                    recipient,
                    deadline: to_alloy_u256(DEADLINE),
                    amountOut: amount,
                    amountInMaximum: limit,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            }
            .abi_encode(),
        };

        let value = match (native_in, request.kind) {
            (false, _) => U256::zero(),
            (true, TradeKind::ExactInput) => request.amount,
            (true, TradeKind::ExactOutput) => request.limit,
        };

        let mut calls = vec![swap];
        if native_out {
            let minimum = match request.kind {
                TradeKind::ExactInput => limit,
                TradeKind::ExactOutput => amount,
            };
            calls.push(
                Router::unwrapWETH9Call {
                    amountMinimum: minimum,
                    recipient: owner,
                }
                .abi_encode(),
            );
        }
        if native_in && request.kind == TradeKind::ExactOutput {
            calls.push(Router::refundETHCall.abi_encode());
        }
        single_or_multicall(self.addresses.swap_router, calls, value)
    }

    /// Mint with the full desired amounts. A native side is paid in
    /// `msg.value` and the unused part refunded.
    fn mint(&self, request: &MintRequest) -> Call {
        let mint = Manager::mintCall {
            params: Manager::MintParams {
                token0: to_alloy_address(&request.token0),
                token1: to_alloy_address(&request.token1),
                fee: fee(request.fee),
                tickLower: tick(request.tick_lower),
                tickUpper: tick(request.tick_upper),
                amount0Desired: to_alloy_u256(request.amount0_desired),
                amount1Desired: to_alloy_u256(request.amount1_desired),
                amount0Min: to_alloy_u256(request.amount0_min),
                amount1Min: to_alloy_u256(request.amount1_min),
                recipient: to_alloy_address(&request.recipient),
                deadline: to_alloy_u256(DEADLINE),
            },
        }
        .abi_encode();

        let value = if self.is_native(&request.token0) {
            request.amount0_desired
        } else if self.is_native(&request.token1) {
            request.amount1_desired
        } else {
            U256::zero()
        };

        let mut calls = vec![mint];
        if !value.is_zero() {
            calls.push(Manager::refundETHCall.abi_encode());
        }
        single_or_multicall(self.addresses.position_manager, calls, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::from_alloy_address;
    use crate::uniswap::contracts::{MAINNET_USDC, MAINNET_WETH};
    use rangekeeper_domain::entities::PositionId;

    fn encoder() -> UniswapCallEncoder {
        UniswapCallEncoder::new(UniswapAddresses::mainnet().unwrap())
    }

    fn usdc() -> Address {
        MAINNET_USDC.parse().unwrap()
    }

    fn weth() -> Address {
        MAINNET_WETH.parse().unwrap()
    }

    fn dai() -> Address {
        "0x6B175474E89094C44Da98b954EedeAC495271d0F".parse().unwrap()
    }

    fn owner() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    /// Selectors of the inner calls of a multicall.
    fn inner_selectors(data: &[u8]) -> Vec<[u8; 4]> {
        let multicall = Manager::multicallCall::abi_decode(data).unwrap();
        multicall
            .data
            .iter()
            .map(|inner| {
                let mut selector = [0u8; 4];
                selector.copy_from_slice(&inner[..4]);
                selector
            })
            .collect()
    }

    #[test]
    fn test_approve_is_unlimited() {
        let call = encoder().approve(&usdc(), &encoder().position_manager());
        assert_eq!(call.to, usdc());
        let approve = IERC20::approveCall::abi_decode(&call.data).unwrap();
        assert_eq!(
            from_alloy_address(approve.spender),
            encoder().position_manager()
        );
        assert_eq!(approve.amount, primitives::U256::MAX);
    }

    #[test]
    fn test_burn_unwraps_native_side() {
        let call = encoder().burn(&BurnRequest {
            id: PositionId::from(7),
            liquidity: 1_000,
            token0: usdc(),
            token1: weth(),
            amount0_min: U256::from(3u64),
            amount1_min: U256::zero(),
            recipient: owner(),
        });
        assert_eq!(call.to, encoder().position_manager());
        assert!(call.value.is_zero());
        assert_eq!(
            inner_selectors(&call.data),
            vec![
                Manager::decreaseLiquidityCall::SELECTOR,
                Manager::collectCall::SELECTOR,
                Manager::unwrapWETH9Call::SELECTOR,
                Manager::sweepTokenCall::SELECTOR
            ]
        );

        let inner = Manager::multicallCall::abi_decode(&call.data).unwrap().data;
        let decrease = Manager::decreaseLiquidityCall::abi_decode(&inner[0]).unwrap();
        assert_eq!(decrease.params.tokenId, primitives::U256::from(7));
        assert_eq!(decrease.params.liquidity, 1_000);
        assert_eq!(decrease.params.amount0Min, primitives::U256::from(3));
        let collect = Manager::collectCall::abi_decode(&inner[1]).unwrap();
        assert!(collect.params.recipient.is_zero());
        assert_eq!(collect.params.amount0Max, u128::MAX);
        let sweep = Manager::sweepTokenCall::abi_decode(&inner[3]).unwrap();
        assert_eq!(from_alloy_address(sweep.token), usdc());
        assert_eq!(from_alloy_address(sweep.recipient), owner());
    }

    #[test]
    fn test_burn_without_native_collects_to_owner() {
        let call = encoder().burn(&BurnRequest {
            id: PositionId::from(7),
            liquidity: 1_000,
            token0: dai(),
            token1: usdc(),
            amount0_min: U256::zero(),
            amount1_min: U256::zero(),
            recipient: owner(),
        });
        assert_eq!(
            inner_selectors(&call.data),
            vec![
                Manager::decreaseLiquidityCall::SELECTOR,
                Manager::collectCall::SELECTOR
            ]
        );
        let inner = Manager::multicallCall::abi_decode(&call.data).unwrap().data;
        let collect = Manager::collectCall::abi_decode(&inner[1]).unwrap();
        assert_eq!(from_alloy_address(collect.params.recipient), owner());
    }

    #[test]
    fn test_swap_exact_input_token_for_native() {
        let call = encoder().swap(&SwapRequest {
            token_in: usdc(),
            token_out: weth(),
            fee: 3000,
            kind: TradeKind::ExactInput,
            amount: U256::from(1_000_000u64),
            limit: U256::from(500u64),
            recipient: owner(),
        });
        assert_eq!(call.to, encoder().swap_router());
        assert!(call.value.is_zero());
        assert_eq!(
            inner_selectors(&call.data),
            vec![
                Router::exactInputSingleCall::SELECTOR,
                Router::unwrapWETH9Call::SELECTOR
            ]
        );
        let inner = Manager::multicallCall::abi_decode(&call.data).unwrap().data;
        let unwrap = Router::unwrapWETH9Call::abi_decode(&inner[1]).unwrap();
        assert_eq!(unwrap.amountMinimum, primitives::U256::from(500));
    }

    #[test]
    fn test_swap_exact_output_paid_in_native() {
        let call = encoder().swap(&SwapRequest {
            token_in: weth(),
            token_out: usdc(),
            fee: 3000,
            kind: TradeKind::ExactOutput,
            amount: U256::from(1_000_000u64),
            limit: U256::from(700u64),
            recipient: owner(),
        });
        assert_eq!(call.value, U256::from(700u64));
        assert_eq!(
            inner_selectors(&call.data),
            vec![
                Router::exactOutputSingleCall::SELECTOR,
                Router::refundETHCall::SELECTOR
            ]
        );
    }

    #[test]
    fn test_swap_plain_tokens_is_single_call() {
        let call = encoder().swap(&SwapRequest {
            token_in: dai(),
            token_out: usdc(),
            fee: 500,
            kind: TradeKind::ExactInput,
            amount: U256::from(10u64),
            limit: U256::from(9u64),
            recipient: owner(),
        });
        let swap = Router::exactInputSingleCall::abi_decode(&call.data).unwrap();
        assert_eq!(from_alloy_address(swap.params.recipient), owner());
        assert_eq!(swap.params.fee, U24::from(500));
        assert_eq!(swap.params.deadline, primitives::U256::MAX);
        assert_eq!(swap.params.amountIn, primitives::U256::from(10));
        assert_eq!(swap.params.amountOutMinimum, primitives::U256::from(9));
        assert_eq!(call.data.len(), 4 + 8 * 32);
    }

    #[test]
    fn test_mint_refunds_native_value() {
        let call = encoder().mint(&MintRequest {
            token0: usdc(),
            token1: weth(),
            fee: 3000,
            tick_lower: -60,
            tick_upper: 120,
            amount0_desired: U256::from(5u64),
            amount1_desired: U256::from(9u64),
            amount0_min: U256::from(4u64),
            amount1_min: U256::from(8u64),
            recipient: owner(),
        });
        assert_eq!(call.value, U256::from(9u64));
        assert_eq!(
            inner_selectors(&call.data),
            vec![Manager::mintCall::SELECTOR, Manager::refundETHCall::SELECTOR]
        );
    }

    #[test]
    fn test_mint_without_native_is_plain() {
        let call = encoder().mint(&MintRequest {
            token0: dai(),
            token1: usdc(),
            fee: 500,
            tick_lower: -60,
            tick_upper: 120,
            amount0_desired: U256::from(5u64),
            amount1_desired: U256::from(9u64),
            amount0_min: U256::zero(),
            amount1_min: U256::zero(),
            recipient: owner(),
        });
        assert!(call.value.is_zero());
        let mint = Manager::mintCall::abi_decode(&call.data).unwrap();
        assert_eq!(mint.params.tickLower.as_i32(), -60);
        assert_eq!(mint.params.tickUpper.as_i32(), 120);
        assert_eq!(from_alloy_address(mint.params.recipient), owner());
        assert_eq!(call.data.len(), 4 + 11 * 32);
    }
}
