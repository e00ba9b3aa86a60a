//! Constitutional committee members

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::CommitteeMember;
use crate::reconcile::Reconciler;
use crate::source::ChainSource;
use crate::store::RecordStore;

/// Keeps `committee_data` current, one row per cold credential. The whole
/// committee is a handful of rows so every run fetches it in full.
pub struct CommitteeSync {
    source: Arc<dyn ChainSource>,
    store: Arc<dyn RecordStore<CommitteeMember>>,
}

impl CommitteeSync {
    pub fn new(source: Arc<dyn ChainSource>, store: Arc<dyn RecordStore<CommitteeMember>>) -> Self {
        Self { source, store }
    }

    async fn members(&self) -> Result<Vec<CommitteeMember>> {
        let infos = self.source.committee_info().await?;
        Ok(infos.into_iter().flat_map(|info| info.into_members()).collect())
    }
}

#[async_trait]
impl Reconciler for CommitteeSync {
    type Record = CommitteeMember;

    fn name(&self) -> &'static str {
        "committee_data"
    }

    async fn load_stored(&self) -> Result<Vec<CommitteeMember>> {
        self.store.load_all().await
    }

    async fn fetch_full(&self) -> Result<Vec<CommitteeMember>> {
        self.members().await
    }

    async fn fetch_recent(&self, _stored: &[CommitteeMember]) -> Result<Vec<CommitteeMember>> {
        self.members().await
    }

    async fn persist(&self, records: &[CommitteeMember]) -> Result<()> {
        self.store.upsert(records).await.map(|_| ())
    }

    fn compare(&self, a: &CommitteeMember, b: &CommitteeMember) -> Ordering {
        a.cc_cold_id.cmp(&b.cc_cold_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommitteeInfo, CommitteeMemberInfo};
    use crate::reconcile::sync_entity;
    use crate::store::MemoryStore;
    use crate::sync::testing::FakeChain;

    fn member(cold: &str, status: &str) -> CommitteeMemberInfo {
        CommitteeMemberInfo {
            cc_cold_id: cold.into(),
            cc_hot_id: Some(format!("{cold}-hot")),
            cc_cold_hex: None,
            cc_hot_hex: None,
            status: Some(status.into()),
            expiration_epoch: Some(580),
        }
    }

    #[tokio::test]
    async fn members_carry_committee_quorum() {
        let chain = Arc::new(FakeChain {
            committee: vec![CommitteeInfo {
                proposal_id: None,
                quorum_numerator: Some(2),
                quorum_denominator: Some(3),
                members: vec![member("cc_cold_b", "authorized"), member("cc_cold_a", "authorized")],
            }],
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::<CommitteeMember>::new());
        let sync = CommitteeSync::new(chain, store.clone());

        let synced = sync_entity(&sync).await.unwrap();

        assert_eq!(synced.records.len(), 2);
        assert_eq!(synced.records[0].cc_cold_id, "cc_cold_a");
        assert!(synced.records.iter().all(|m| m.quorum_denominator == Some(3)));
    }

    #[tokio::test]
    async fn unchanged_committee_writes_nothing() {
        let info = CommitteeInfo {
            proposal_id: None,
            quorum_numerator: Some(2),
            quorum_denominator: Some(3),
            members: vec![member("cc_cold_a", "authorized")],
        };
        let chain = Arc::new(FakeChain {
            committee: vec![info.clone()],
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::with_rows(info.into_members()));
        let sync = CommitteeSync::new(chain, store.clone());

        let synced = sync_entity(&sync).await.unwrap();
        assert_eq!(synced.outcome.upserted, 0);
        assert_eq!(store.upsert_calls(), 0);
    }
}
