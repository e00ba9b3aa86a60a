//! Chain tip snapshot

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::model::ChainTip;
use crate::source::ChainSource;
use crate::store::RecordStore;

/// Fetch the current tip and overwrite the single stored row.
///
/// The tip moves every block, so there is nothing to diff.
pub async fn sync_chain_tip(
    source: &Arc<dyn ChainSource>,
    store: &Arc<dyn RecordStore<ChainTip>>,
) -> Result<ChainTip> {
    let tip = source.tip().await?;
    store.upsert(std::slice::from_ref(&tip)).await?;
    info!(epoch = tip.epoch_no, block = tip.block_height, "chain tip stored");
    Ok(tip)
}
