use crate::convert::{
    from_alloy_address, from_alloy_u256, from_b256, to_alloy_address, to_alloy_u256, to_b256,
};
use crate::gateway::{Log, Receipt};
use crate::uniswap::contracts::INonfungiblePositionManager::Transfer;
use alloy::sol_types::SolEvent;
use primitive_types::U256;
use rangekeeper_domain::entities::PositionId;
use rangekeeper_domain::value_objects::Address;

/// Id of the position NFT minted to `owner` by `manager` in this receipt.
///
/// Only `Transfer(0x0 -> owner, id)` logs emitted by the manager count; other
/// transfers in the same receipt are ignored.
pub fn parse_minted_position_id(
    receipt: &Receipt,
    manager: &Address,
    owner: &Address,
) -> Option<PositionId> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == *manager)
        .filter_map(|log| {
            Transfer::decode_raw_log(log.topics.iter().map(to_b256), &log.data).ok()
        })
        .find(|transfer| transfer.from.is_zero() && from_alloy_address(transfer.to) == *owner)
        .map(|transfer| PositionId(from_alloy_u256(transfer.tokenId)))
}

/// ERC-721 `Transfer` log as emitted by `emitter`.
pub fn transfer_log(emitter: Address, from: Address, to: Address, id: U256) -> Log {
    let data = Transfer {
        from: to_alloy_address(&from),
        to: to_alloy_address(&to),
        tokenId: to_alloy_u256(id),
    }
    .encode_log_data();
    Log {
        address: emitter,
        topics: data.topics().iter().copied().map(from_b256).collect(),
        data: data.data.to_vec(),
    }
}
