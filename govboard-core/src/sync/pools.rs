//! Stake pool registry

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{fetch_paged, SyncSettings};
use crate::error::Result;
use crate::model::SpoRecord;
use crate::reconcile::{Enriched, Reconciler};
use crate::source::ChainSource;
use crate::store::RecordStore;

/// Keeps `spo_data` current. `/pool_list` is paged through in full on every
/// run, then new or changed pools get their `/pool_info` figures fetched in
/// chunks.
pub struct SpoSync {
    source: Arc<dyn ChainSource>,
    store: Arc<dyn RecordStore<SpoRecord>>,
    settings: SyncSettings,
}

impl SpoSync {
    pub fn new(
        source: Arc<dyn ChainSource>,
        store: Arc<dyn RecordStore<SpoRecord>>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    async fn list_all(&self) -> Result<Vec<SpoRecord>> {
        let source = &self.source;
        fetch_paged(self.settings.page_size, self.settings.page_delay(), |offset, limit| {
            source.pool_list_page(offset, limit)
        })
        .await
    }
}

#[async_trait]
impl Reconciler for SpoSync {
    type Record = SpoRecord;

    fn name(&self) -> &'static str {
        "spo_data"
    }

    async fn load_stored(&self) -> Result<Vec<SpoRecord>> {
        self.store.load_all().await
    }

    async fn fetch_full(&self) -> Result<Vec<SpoRecord>> {
        self.list_all().await
    }

    async fn fetch_recent(&self, _stored: &[SpoRecord]) -> Result<Vec<SpoRecord>> {
        self.list_all().await
    }

    async fn enrich_all(&self, records: Vec<SpoRecord>) -> Vec<Enriched<SpoRecord>> {
        let chunk_size = self.settings.chunk_size.max(1);
        let mut enriched = Vec::with_capacity(records.len());

        for chunk in records.chunks(chunk_size) {
            let ids: Vec<String> = chunk.iter().map(|p| p.pool_id_bech32.clone()).collect();
            match self.source.pool_info(&ids).await {
                Ok(details) => {
                    let by_id: HashMap<&str, _> = details
                        .iter()
                        .map(|d| (d.pool_id_bech32.as_str(), d))
                        .collect();
                    enriched.extend(chunk.iter().cloned().map(|mut pool| {
                        if let Some(d) = by_id.get(pool.pool_id_bech32.as_str()) {
                            pool.apply_details(d);
                        }
                        Enriched::Done(pool)
                    }));
                }
                Err(err) => {
                    warn!(entity = "spo_data", pools = ids.len(), error = %err, "pool_info failed, keeping chunk as listed");
                    enriched.extend(chunk.iter().cloned().map(Enriched::Failed));
                }
            }
        }
        enriched
    }

    fn keep_enrichment(&self, stored: &SpoRecord, mut fetched: SpoRecord) -> SpoRecord {
        fetched.keep_details(stored);
        fetched
    }

    async fn persist(&self, records: &[SpoRecord]) -> Result<()> {
        self.store.upsert(records).await.map(|_| ())
    }

    fn compare(&self, a: &SpoRecord, b: &SpoRecord) -> Ordering {
        a.pool_id_bech32.cmp(&b.pool_id_bech32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PoolDetails;
    use crate::reconcile::sync_entity;
    use crate::store::MemoryStore;
    use crate::sync::testing::FakeChain;
    use std::sync::atomic::Ordering as AtomicOrdering;

    fn pool(id: &str, ticker: &str) -> SpoRecord {
        let mut p = SpoRecord::new(id);
        p.ticker = Some(ticker.into());
        p.pool_status = Some("registered".into());
        p
    }

    fn details(id: &str, stake: &str) -> PoolDetails {
        PoolDetails {
            pool_id_bech32: id.into(),
            live_stake: Some(stake.into()),
            live_delegators: Some(12),
            ..Default::default()
        }
    }

    fn settings() -> SyncSettings {
        SyncSettings {
            page_size: 2,
            page_delay_ms: 0,
            chunk_size: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn full_sync_pages_and_enriches_in_chunks() {
        let chain = Arc::new(FakeChain {
            pools: vec![pool("pool1a", "A"), pool("pool1b", "B"), pool("pool1c", "C")],
            pool_details: vec![details("pool1a", "1"), details("pool1b", "2"), details("pool1c", "3")],
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::<SpoRecord>::new());
        let sync = SpoSync::new(chain.clone(), store.clone(), settings());

        let synced = sync_entity(&sync).await.unwrap();

        assert_eq!(synced.records.len(), 3);
        assert_eq!(chain.pool_info_calls.load(AtomicOrdering::SeqCst), 2);
        assert!(synced.records.iter().all(|p| p.live_stake.is_some()));
    }

    #[tokio::test]
    async fn enriched_fields_do_not_mark_rows_dirty() {
        let mut stored = pool("pool1a", "A");
        stored.apply_details(&details("pool1a", "1"));
        let chain = Arc::new(FakeChain {
            pools: vec![pool("pool1a", "A"), pool("pool1b", "B")],
            pool_details: vec![details("pool1b", "5")],
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::with_rows(vec![stored.clone()]));
        let sync = SpoSync::new(chain.clone(), store.clone(), settings());

        let synced = sync_entity(&sync).await.unwrap();

        assert_eq!(synced.outcome.upserted, 1);
        assert_eq!(synced.records[0], stored);
        assert_eq!(synced.records[1].live_stake.as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn pool_info_failure_keeps_listed_rows() {
        let chain = Arc::new(FakeChain {
            pools: vec![pool("pool1a", "A")],
            fail_pool_info: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::<SpoRecord>::new());
        let sync = SpoSync::new(chain, store.clone(), settings());

        let synced = sync_entity(&sync).await.unwrap();
        assert_eq!(synced.records, vec![pool("pool1a", "A")]);
        assert_eq!(store.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn pool_info_failure_keeps_stored_live_figures() {
        let mut stored = pool("pool1a", "A");
        stored.apply_details(&details("pool1a", "900"));
        let chain = Arc::new(FakeChain {
            pools: vec![pool("pool1a", "RENAMED")],
            fail_pool_info: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::with_rows(vec![stored]));
        let sync = SpoSync::new(chain, store.clone(), settings());

        let synced = sync_entity(&sync).await.unwrap();

        assert_eq!(synced.outcome.upserted, 1);
        assert_eq!(synced.records[0].ticker.as_deref(), Some("RENAMED"));
        assert_eq!(synced.records[0].live_stake.as_deref(), Some("900"));
        assert_eq!(synced.records[0].live_delegators, Some(12));

        let rows = store.rows().await;
        assert_eq!(rows[0].ticker.as_deref(), Some("RENAMED"));
        assert_eq!(rows[0].live_stake.as_deref(), Some("900"));
    }
}
