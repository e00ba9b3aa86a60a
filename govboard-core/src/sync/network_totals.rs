//! Per-epoch treasury/reserve/supply totals

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use super::SyncSettings;
use crate::error::Result;
use crate::model::NetworkTotals;
use crate::reconcile::Reconciler;
use crate::source::ChainSource;
use crate::store::RecordStore;

/// Keeps `network_totals` current. An incremental run re-fetches the last
/// `recent_epochs` epochs ending at the chain tip and attaches `/epoch_info`
/// to every row it writes.
pub struct NetworkTotalsSync {
    source: Arc<dyn ChainSource>,
    store: Arc<dyn RecordStore<NetworkTotals>>,
    settings: SyncSettings,
}

impl NetworkTotalsSync {
    pub fn new(
        source: Arc<dyn ChainSource>,
        store: Arc<dyn RecordStore<NetworkTotals>>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }
}

#[async_trait]
impl Reconciler for NetworkTotalsSync {
    type Record = NetworkTotals;

    fn name(&self) -> &'static str {
        "network_totals"
    }

    async fn load_stored(&self) -> Result<Vec<NetworkTotals>> {
        self.store.load_all().await
    }

    async fn fetch_full(&self) -> Result<Vec<NetworkTotals>> {
        self.source.totals(None).await
    }

    async fn fetch_recent(&self, _stored: &[NetworkTotals]) -> Result<Vec<NetworkTotals>> {
        let newest = self.source.tip().await?.epoch_no;
        let window = self.settings.recent_epochs.max(1);
        let oldest = newest.saturating_sub(window - 1);

        let mut rows = Vec::new();
        for epoch in (oldest..=newest).rev() {
            rows.extend(self.source.totals(Some(epoch)).await?);
        }
        Ok(rows)
    }

    fn enrich_concurrency(&self) -> usize {
        self.settings.enrich_concurrency
    }

    async fn enrich_one(&self, mut record: NetworkTotals) -> Result<NetworkTotals> {
        record.epoch_info = self.source.epoch_info(record.epoch_no).await?;
        Ok(record)
    }

    fn keep_enrichment(&self, stored: &NetworkTotals, mut fetched: NetworkTotals) -> NetworkTotals {
        if fetched.epoch_info.is_none() {
            fetched.epoch_info = stored.epoch_info.clone();
        }
        fetched
    }

    async fn persist(&self, records: &[NetworkTotals]) -> Result<()> {
        self.store.upsert(records).await.map(|_| ())
    }

    fn compare(&self, a: &NetworkTotals, b: &NetworkTotals) -> Ordering {
        b.epoch_no.cmp(&a.epoch_no)
    }
}
