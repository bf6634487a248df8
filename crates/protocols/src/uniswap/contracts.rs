use alloy::sol;
use rangekeeper_domain::DomainError;
use rangekeeper_domain::value_objects::Address;
use serde::{Deserialize, Serialize};

/// Ethereum mainnet WETH9.
pub const MAINNET_WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
/// Ethereum mainnet USDC.
pub const MAINNET_USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const MAINNET_FACTORY: &str = "0x1F98431c8aD98523631AE4a59f267346ea31F984";
pub const MAINNET_POSITION_MANAGER: &str = "0xC36442b4a4522E871399CD717aBDD847Ab11FE88";
pub const MAINNET_SWAP_ROUTER: &str = "0xE592427A0AEce92De3Edee1F18E0157C05861564";
pub const MAINNET_QUOTER: &str = "0xb27308f9F90D607463bb33eA1BeBb41C27CE5AB6";

/// Periphery and core contract addresses for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniswapAddresses {
    /// `UniswapV3Factory`.
    pub factory: Address,
    /// `NonfungiblePositionManager`.
    pub position_manager: Address,
    /// `SwapRouter` (v1).
    pub swap_router: Address,
    /// `Quoter` (v1).
    pub quoter: Address,
    /// Wrapped native token (WETH9).
    pub wrapped_native: Address,
}

impl UniswapAddresses {
    /// Ethereum mainnet deployment.
    pub fn mainnet() -> Result<Self, DomainError> {
        Ok(Self {
            factory: MAINNET_FACTORY.parse()?,
            position_manager: MAINNET_POSITION_MANAGER.parse()?,
            swap_router: MAINNET_SWAP_ROUTER.parse()?,
            quoter: MAINNET_QUOTER.parse()?,
            wrapped_native: MAINNET_WETH.parse()?,
        })
    }
}

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Tokens such as MKR that return `bytes32` from `symbol()`.
    interface IERC20Bytes32 {
        function symbol() external view returns (bytes32);
    }

    interface IUniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }

    interface IUniswapV3Pool {
        function slot0() external view returns (
            uint160 sqrtPriceX96,
            int24 tick,
            uint16 observationIndex,
            uint16 observationCardinality,
            uint16 observationCardinalityNext,
            uint8 feeProtocol,
            bool unlocked
        );
        function liquidity() external view returns (uint128);
    }

    interface INonfungiblePositionManager {
        struct MintParams {
            address token0;
            address token1;
            uint24 fee;
            int24 tickLower;
            int24 tickUpper;
            uint256 amount0Desired;
            uint256 amount1Desired;
            uint256 amount0Min;
            uint256 amount1Min;
            address recipient;
            uint256 deadline;
        }

        struct DecreaseLiquidityParams {
            uint256 tokenId;
            uint128 liquidity;
            uint256 amount0Min;
            uint256 amount1Min;
            uint256 deadline;
        }

        struct CollectParams {
            uint256 tokenId;
            address recipient;
            uint128 amount0Max;
            uint128 amount1Max;
        }

        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
        function positions(uint256 tokenId) external view returns (
            uint96 nonce,
            address operator,
            address token0,
            address token1,
            uint24 fee,
            int24 tickLower,
            int24 tickUpper,
            uint128 liquidity,
            uint256 feeGrowthInside0LastX128,
            uint256 feeGrowthInside1LastX128,
            uint128 tokensOwed0,
            uint128 tokensOwed1
        );
        function mint(MintParams calldata params) external payable returns (
            uint256 tokenId,
            uint128 liquidity,
            uint256 amount0,
            uint256 amount1
        );
        function decreaseLiquidity(DecreaseLiquidityParams calldata params) external payable returns (uint256 amount0, uint256 amount1);
        function collect(CollectParams calldata params) external payable returns (uint256 amount0, uint256 amount1);
        function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
        function refundETH() external payable;
        function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;
        function sweepToken(address token, uint256 amountMinimum, address recipient) external payable;
    }

    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountOut;
            uint256 amountInMaximum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
        function exactOutputSingle(ExactOutputSingleParams calldata params) external payable returns (uint256 amountIn);
        function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
        function refundETH() external payable;
        function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;
    }

    interface IQuoter {
        function quoteExactInputSingle(
            address tokenIn,
            address tokenOut,
            uint24 fee,
            uint256 amountIn,
            uint160 sqrtPriceLimitX96
        ) external returns (uint256 amountOut);
        function quoteExactOutputSingle(
            address tokenIn,
            address tokenOut,
            uint24 fee,
            uint256 amountOut,
            uint160 sqrtPriceLimitX96
        ) external returns (uint256 amountIn);
    }
}
