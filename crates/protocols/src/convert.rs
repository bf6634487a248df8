//! Conversions between the domain's integer and address types and alloy's.

use alloy::primitives::{self, B256};
use primitive_types::{H160, H256, U256};
use rangekeeper_domain::value_objects::Address;

pub fn to_alloy_address(address: &Address) -> primitives::Address {
    primitives::Address::from_slice(address.as_bytes())
}

pub fn from_alloy_address(address: primitives::Address) -> Address {
    Address(H160::from_slice(address.as_slice()))
}

/// Both sides store little-endian 64-bit limbs.
pub fn to_alloy_u256(value: U256) -> primitives::U256 {
    primitives::U256::from_limbs(value.0)
}

pub fn from_alloy_u256(value: primitives::U256) -> U256 {
    U256(value.into_limbs())
}

pub fn to_b256(hash: &H256) -> B256 {
    B256::from(hash.0)
}

pub fn from_b256(hash: B256) -> H256 {
    H256(hash.0)
}
