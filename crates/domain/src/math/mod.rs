/// Liquidity and token amount math over Q64.96 square root prices.
pub mod concentrated_liquidity;
/// Tick and price conversions.
pub mod price_tick;
/// Conversions between integer, rational and decimal representations.
pub mod rational;
