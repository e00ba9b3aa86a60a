//! Reconcilers for each Koios-backed entity

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub mod committee;
pub mod dreps;
pub mod network_totals;
pub mod pools;
pub mod proposals;
pub mod run;
pub mod tip;

#[cfg(test)]
pub(crate) mod testing;

pub use committee::CommitteeSync;
pub use dreps::DrepSync;
pub use network_totals::NetworkTotalsSync;
pub use pools::SpoSync;
pub use proposals::GovernanceProposalsSync;
pub use run::{run_entity, Entity, EntityReport, Stores};
pub use tip::sync_chain_tip;

/// Knobs shared by the reconcilers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Epochs re-fetched on an incremental totals run, newest included.
    #[serde(default = "default_recent_epochs")]
    pub recent_epochs: u32,

    /// Rows per `/pool_list` or `/drep_list` page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pause between list pages.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Ids per `/pool_info`, `/drep_info` request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Concurrent per-record enrichment lookups.
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            recent_epochs: default_recent_epochs(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            chunk_size: default_chunk_size(),
            enrich_concurrency: default_enrich_concurrency(),
        }
    }
}

impl SyncSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

fn default_recent_epochs() -> u32 {
    5
}

fn default_page_size() -> usize {
    1000
}

fn default_page_delay_ms() -> u64 {
    250
}

fn default_chunk_size() -> usize {
    50
}

fn default_enrich_concurrency() -> usize {
    1
}

/// Walk an offset/limit listing until a short page comes back, sleeping
/// `delay` between pages.
pub async fn fetch_paged<T, F, Fut>(page_size: usize, delay: Duration, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let page_size = page_size.max(1);
    let mut rows = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch_page(offset, page_size).await?;
        let len = page.len();
        rows.extend(page);
        debug!(offset, len, "fetched page");

        if len < page_size {
            break;
        }
        offset += len;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(rows)
}
