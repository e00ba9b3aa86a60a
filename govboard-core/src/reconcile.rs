//! Incremental sync of one entity: read the store, diff it against fresh
//! external data, enrich what changed, upsert, and hand back the merged set.
//!
//! There is no transaction around the read-compare-write sequence.
//! Correctness relies on the store's upsert being idempotent on the record
//! key, so two concurrent runs at worst write the same row twice.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::diff::diff_records;
use crate::error::Result;

/// A row mirrored from an external source, identified by a natural key.
pub trait SyncRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Key: Eq + Hash + Clone + Debug + Display + Send + Sync;

    fn key(&self) -> Self::Key;
}

/// Per-entity sync behaviour. Only the fetch and persist steps are required;
/// diffing, enrichment and ordering have defaults.
#[async_trait]
pub trait Reconciler: Send + Sync {
    type Record: SyncRecord;

    /// Entity name used in logs.
    fn name(&self) -> &'static str;

    /// All stored rows, in the store's configured order.
    async fn load_stored(&self) -> Result<Vec<Self::Record>>;

    /// The complete external dataset, used when the store is empty.
    async fn fetch_full(&self) -> Result<Vec<Self::Record>>;

    /// A bounded recent window of external data.
    async fn fetch_recent(&self, stored: &[Self::Record]) -> Result<Vec<Self::Record>>;

    /// Records that need enriching and persisting.
    fn dirty(&self, stored: &[Self::Record], fetched: Vec<Self::Record>) -> Vec<Self::Record> {
        diff_records(stored, fetched)
    }

    /// How many `enrich_one` calls may be in flight at once.
    fn enrich_concurrency(&self) -> usize {
        1
    }

    /// Attach secondary data to a single record.
    async fn enrich_one(&self, record: Self::Record) -> Result<Self::Record> {
        Ok(record)
    }

    /// Enrich a set of records, preserving order. A failed lookup yields the
    /// record as fetched, marked [`Enriched::Failed`].
    async fn enrich_all(&self, records: Vec<Self::Record>) -> Vec<Enriched<Self::Record>> {
        let concurrency = self.enrich_concurrency().max(1);
        stream::iter(records)
            .map(|record| async move {
                let key = record.key();
                let fallback = record.clone();
                match self.enrich_one(record).await {
                    Ok(enriched) => Enriched::Done(enriched),
                    Err(err) => {
                        warn!(entity = self.name(), %key, error = %err, "enrichment failed, keeping record");
                        Enriched::Failed(fallback)
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await
    }

    /// Fill the enrichment a failed lookup left empty on `fetched` from the
    /// stored row with the same key. `persist` replaces whole rows.
    fn keep_enrichment(&self, _stored: &Self::Record, fetched: Self::Record) -> Self::Record {
        fetched
    }

    /// Upsert records keyed on their natural key.
    async fn persist(&self, records: &[Self::Record]) -> Result<()>;

    /// Ordering of the returned collection. `Equal` keeps source order.
    fn compare(&self, _a: &Self::Record, _b: &Self::Record) -> Ordering {
        Ordering::Equal
    }
}

/// One record after [`Reconciler::enrich_all`].
#[derive(Debug, Clone, PartialEq)]
pub enum Enriched<R> {
    Done(R),
    /// A lookup failed; the record carries at most part of its enrichment.
    Failed(R),
}

impl<R> Enriched<R> {
    pub fn into_inner(self) -> R {
        match self {
            Enriched::Done(record) | Enriched::Failed(record) => record,
        }
    }
}

/// Counters describing one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub stored: usize,
    pub fetched: usize,
    pub upserted: usize,
    pub returned: usize,
    pub full_refresh: bool,
}

/// Result of [`sync_entity`]: the merged rows plus counters.
#[derive(Debug, Clone)]
pub struct Synced<R> {
    pub records: Vec<R>,
    pub outcome: SyncOutcome,
}

/// Run one incremental sync and return the merged, ordered collection.
///
/// Any fetch or store failure aborts the whole run. Enrichment failures are
/// per record and never abort.
pub async fn fetch_and_update<R: Reconciler + ?Sized>(reconciler: &R) -> Result<Vec<R::Record>> {
    sync_entity(reconciler).await.map(|synced| synced.records)
}

/// [`fetch_and_update`] with counters attached.
pub async fn sync_entity<R: Reconciler + ?Sized>(reconciler: &R) -> Result<Synced<R::Record>> {
    let entity = reconciler.name();
    let stored = reconciler.load_stored().await?;

    if stored.is_empty() {
        info!(entity, "store empty, running full fetch");
        let fetched = reconciler.fetch_full().await?;
        let fetched_count = fetched.len();
        let mut records: Vec<_> = reconciler
            .enrich_all(fetched)
            .await
            .into_iter()
            .map(Enriched::into_inner)
            .collect();
        if !records.is_empty() {
            reconciler.persist(&records).await?;
        }
        records.sort_by(|a, b| reconciler.compare(a, b));

        let outcome = SyncOutcome {
            stored: 0,
            fetched: fetched_count,
            upserted: records.len(),
            returned: records.len(),
            full_refresh: true,
        };
        info!(entity, upserted = outcome.upserted, "full sync complete");
        return Ok(Synced { records, outcome });
    }

    let stored_count = stored.len();
    let fetched = reconciler.fetch_recent(&stored).await?;
    let fetched_count = fetched.len();
    let dirty = reconciler.dirty(&stored, fetched);
    debug!(entity, stored = stored_count, fetched = fetched_count, dirty = dirty.len(), "diff computed");

    let updated = if dirty.is_empty() {
        Vec::new()
    } else {
        let enriched = reconciler.enrich_all(dirty).await;
        let enriched = restore_enrichment(reconciler, &stored, enriched);
        reconciler.persist(&enriched).await?;
        enriched
    };

    let mut records = merge_by_key(stored, &updated);
    records.sort_by(|a, b| reconciler.compare(a, b));

    let outcome = SyncOutcome {
        stored: stored_count,
        fetched: fetched_count,
        upserted: updated.len(),
        returned: records.len(),
        full_refresh: false,
    };
    info!(
        entity,
        upserted = outcome.upserted,
        returned = outcome.returned,
        "incremental sync complete"
    );
    Ok(Synced { records, outcome })
}

/// Carry stored enrichment onto records whose lookup failed.
fn restore_enrichment<R: Reconciler + ?Sized>(
    reconciler: &R,
    stored: &[R::Record],
    enriched: Vec<Enriched<R::Record>>,
) -> Vec<R::Record> {
    if !enriched.iter().any(|e| matches!(e, Enriched::Failed(_))) {
        return enriched.into_iter().map(Enriched::into_inner).collect();
    }

    let by_key: HashMap<_, _> = stored.iter().map(|record| (record.key(), record)).collect();
    enriched
        .into_iter()
        .map(|e| match e {
            Enriched::Done(record) => record,
            Enriched::Failed(record) => match by_key.get(&record.key()) {
                Some(previous) => {
                    debug!(entity = reconciler.name(), key = %record.key(), "keeping stored enrichment");
                    reconciler.keep_enrichment(previous, record)
                }
                None => record,
            },
        })
        .collect()
}

/// Replace stored rows by key with their updated version, appending rows
/// that were not stored before.
pub fn merge_by_key<R: SyncRecord>(stored: Vec<R>, updated: &[R]) -> Vec<R> {
    let mut index: HashMap<R::Key, usize> = stored
        .iter()
        .enumerate()
        .map(|(i, record)| (record.key(), i))
        .collect();
    let mut merged = stored;

    for record in updated {
        let key = record.key();
        match index.get(&key) {
            Some(&i) => merged[i] = record.clone(),
            None => {
                index.insert(key, merged.len());
                merged.push(record.clone());
            }
        }
    }
    merged
}
