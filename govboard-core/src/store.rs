//! Persistence seam for synced records

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::reconcile::SyncRecord;

/// A table of records with `select` and `upsert ... on conflict (key)`.
#[async_trait]
pub trait RecordStore<R: SyncRecord>: Send + Sync {
    /// All rows in the table's configured order.
    async fn load_all(&self) -> Result<Vec<R>>;

    /// Insert or replace rows by key, returning the number written.
    async fn upsert(&self, records: &[R]) -> Result<usize>;
}

/// In-memory store. Keeps insertion order and upserts by key.
pub struct MemoryStore<R> {
    rows: Mutex<Vec<R>>,
    upsert_calls: AtomicUsize,
}

impl<R: SyncRecord> MemoryStore<R> {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<R>) -> Self {
        Self {
            rows: Mutex::new(rows),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    pub async fn rows(&self) -> Vec<R> {
        self.rows.lock().await.clone()
    }

    /// How many times `upsert` has been called.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

impl<R: SyncRecord> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: SyncRecord> RecordStore<R> for MemoryStore<R> {
    async fn load_all(&self) -> Result<Vec<R>> {
        Ok(self.rows.lock().await.clone())
    }

    async fn upsert(&self, records: &[R]) -> Result<usize> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().await;
        let mut index: HashMap<R::Key, usize> =
            rows.iter().enumerate().map(|(i, r)| (r.key(), i)).collect();

        for record in records {
            match index.get(&record.key()) {
                Some(&i) => rows[i] = record.clone(),
                None => {
                    index.insert(record.key(), rows.len());
                    rows.push(record.clone());
                }
            }
        }
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkTotals;

    #[tokio::test]
    async fn upsert_replaces_by_key() {
        let store = MemoryStore::new();
        store.upsert(&[NetworkTotals::new(1), NetworkTotals::new(2)]).await.unwrap();

        let mut replacement = NetworkTotals::new(1);
        replacement.fees = Some("9".into());
        store.upsert(&[replacement.clone()]).await.unwrap();

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], replacement);
        assert_eq!(store.upsert_calls(), 2);
    }
}
