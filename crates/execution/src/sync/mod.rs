//! State synchronization with on-chain data.
//!
//! Nothing about the managed position is kept between cycles; the scanner
//! re-derives it from the owner's position NFTs every time.

mod scanner;

pub use scanner::*;
