//! Transaction submission.
//!
//! Every write goes through [`TransactionManager`], which prices the gas,
//! submits the call and waits for the configured confirmations while holding
//! a lock, so at most one transaction is in flight.

mod manager;

pub use manager::{TransactionConfig, TransactionManager};
