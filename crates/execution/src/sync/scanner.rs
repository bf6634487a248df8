//! Discovery of the managed position among the owner's NFTs.

use crate::error::ExecutionError;
use rangekeeper_domain::entities::{PairSpec, Pool, Position};
use rangekeeper_domain::value_objects::Address;
use rangekeeper_protocols::{ChainGateway, PositionData};
use std::sync::Arc;
use tracing::debug;

/// Finds the single live position for a pair.
pub struct PositionScanner {
    gateway: Arc<dyn ChainGateway>,
}

impl PositionScanner {
    /// Creates a new scanner reading through `gateway`.
    pub fn new(gateway: Arc<dyn ChainGateway>) -> Self {
        Self { gateway }
    }

    /// Live positions of `owner` on `pair`, in enumeration order.
    ///
    /// Positions on other pairs or fee tiers, and positions with zero
    /// liquidity, are skipped.
    pub async fn matching(
        &self,
        owner: &Address,
        pair: &PairSpec,
    ) -> Result<Vec<PositionData>, ExecutionError> {
        let ids = self
            .gateway
            .list_owned_position_ids(owner)
            .await
            .map_err(ExecutionError::ChainRead)?;
        debug!(owner = %owner, count = ids.len(), "Scanning owned positions");

        let mut matching = Vec::new();
        for id in ids {
            let data = self
                .gateway
                .get_position(&id)
                .await
                .map_err(ExecutionError::ChainRead)?;
            if !pair.matches(&data.token0, &data.token1, data.fee) {
                continue;
            }
            if data.liquidity == 0 {
                debug!(position = %id, "Skipping empty position");
                continue;
            }
            matching.push(data);
        }
        Ok(matching)
    }

    /// The live position of `owner` on `pool`, if any.
    ///
    /// More than one match is a fatal `TooManyPositions`.
    pub async fn scan(
        &self,
        owner: &Address,
        pair: &PairSpec,
        pool: Arc<Pool>,
    ) -> Result<Option<Position>, ExecutionError> {
        let mut matching = self.matching(owner, pair).await?;
        if matching.len() > 1 {
            return Err(ExecutionError::TooManyPositions {
                count: matching.len(),
            });
        }
        let Some(data) = matching.pop() else {
            return Ok(None);
        };
        let position = Position::new(
            pool,
            data.tick_lower,
            data.tick_upper,
            data.liquidity,
            Some(data.id),
        )?;
        Ok(Some(position))
    }
}
