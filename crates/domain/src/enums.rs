use serde::{Deserialize, Serialize};

/// Which pool token a swap sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Sell token0, buy token1.
    ZeroForOne,
    /// Sell token1, buy token0.
    OneForZero,
}

/// Which side of a swap is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    /// Input amount is fixed, output is quoted.
    ExactInput,
    /// Output amount is fixed, input is quoted.
    ExactOutput,
}
