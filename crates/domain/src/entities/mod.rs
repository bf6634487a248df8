pub mod pool;
pub mod position;
pub mod token;

// Re-export for easier access
pub use pool::{PairSpec, Pool};
pub use position::{Position, PositionId, is_in_range, lower_price, token_amounts, upper_price};
pub use token::Token;
