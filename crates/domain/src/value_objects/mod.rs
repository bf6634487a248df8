/// EVM account addresses.
pub mod address;
/// Raw token amounts.
pub mod amount;
/// Width fractions.
pub mod percentage;
/// Exact prices.
pub mod price;
/// Price and tick bands.
pub mod price_range;

pub use address::Address;
pub use amount::TokenAmount;
pub use percentage::Percentage;
pub use price::Price;
pub use price_range::{PriceRange, TickRange};
