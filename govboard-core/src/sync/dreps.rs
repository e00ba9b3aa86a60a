//! DRep registry

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{fetch_paged, SyncSettings};
use crate::error::Result;
use crate::model::DrepRecord;
use crate::reconcile::{Enriched, Reconciler};
use crate::source::ChainSource;
use crate::store::RecordStore;

/// Keeps `drep_data` current. New or changed DReps get `/drep_info` and
/// `/drep_metadata` attached, one chunk of ids per request.
pub struct DrepSync {
    source: Arc<dyn ChainSource>,
    store: Arc<dyn RecordStore<DrepRecord>>,
    settings: SyncSettings,
}

impl DrepSync {
    pub fn new(
        source: Arc<dyn ChainSource>,
        store: Arc<dyn RecordStore<DrepRecord>>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    async fn list_all(&self) -> Result<Vec<DrepRecord>> {
        let source = &self.source;
        fetch_paged(self.settings.page_size, self.settings.page_delay(), |offset, limit| {
            source.drep_list_page(offset, limit)
        })
        .await
    }

    /// Attach info and metadata to one chunk. False when either lookup failed.
    async fn enrich_chunk(&self, chunk: &mut [DrepRecord]) -> bool {
        let ids: Vec<String> = chunk.iter().map(|d| d.drep_id.clone()).collect();
        let mut complete = true;

        match self.source.drep_info(&ids).await {
            Ok(infos) => {
                let by_id: HashMap<&str, _> = infos.iter().map(|i| (i.drep_id.as_str(), i)).collect();
                for drep in chunk.iter_mut() {
                    if let Some(info) = by_id.get(drep.drep_id.as_str()) {
                        drep.apply_info(info);
                    }
                }
            }
            Err(err) => {
                warn!(entity = "drep_data", dreps = ids.len(), error = %err, "drep_info failed");
                complete = false;
            }
        }

        match self.source.drep_metadata(&ids).await {
            Ok(metadata) => {
                let by_id: HashMap<&str, _> =
                    metadata.iter().map(|m| (m.drep_id.as_str(), m)).collect();
                for drep in chunk.iter_mut() {
                    if let Some(meta) = by_id.get(drep.drep_id.as_str()) {
                        drep.apply_metadata(meta);
                    }
                }
            }
            Err(err) => {
                warn!(entity = "drep_data", dreps = ids.len(), error = %err, "drep_metadata failed");
                complete = false;
            }
        }
        complete
    }
}

#[async_trait]
impl Reconciler for DrepSync {
    type Record = DrepRecord;

    fn name(&self) -> &'static str {
        "drep_data"
    }

    async fn load_stored(&self) -> Result<Vec<DrepRecord>> {
        self.store.load_all().await
    }

    async fn fetch_full(&self) -> Result<Vec<DrepRecord>> {
        self.list_all().await
    }

    async fn fetch_recent(&self, _stored: &[DrepRecord]) -> Result<Vec<DrepRecord>> {
        self.list_all().await
    }

    async fn enrich_all(&self, mut records: Vec<DrepRecord>) -> Vec<Enriched<DrepRecord>> {
        let mut enriched = Vec::with_capacity(records.len());
        for chunk in records.chunks_mut(self.settings.chunk_size.max(1)) {
            let complete = self.enrich_chunk(chunk).await;
            enriched.extend(chunk.iter().cloned().map(|drep| {
                if complete {
                    Enriched::Done(drep)
                } else {
                    Enriched::Failed(drep)
                }
            }));
        }
        enriched
    }

    fn keep_enrichment(&self, stored: &DrepRecord, mut fetched: DrepRecord) -> DrepRecord {
        fetched.fill_missing_details(stored);
        fetched
    }

    async fn persist(&self, records: &[DrepRecord]) -> Result<()> {
        self.store.upsert(records).await.map(|_| ())
    }

    fn compare(&self, a: &DrepRecord, b: &DrepRecord) -> Ordering {
        a.drep_id.cmp(&b.drep_id)
    }
}
