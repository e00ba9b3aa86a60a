//! Governance actions and their voting summaries

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::SyncSettings;
use crate::diff::record_changed;
use crate::error::Result;
use crate::model::GovernanceProposal;
use crate::reconcile::Reconciler;
use crate::source::ChainSource;
use crate::store::RecordStore;

/// Keeps `governance_proposals` current.
///
/// `/proposal_list` is small enough to fetch whole on every run. Vote tallies
/// move without the proposal row changing, so proposals that are still
/// active are re-enriched every run even when their fields match.
pub struct GovernanceProposalsSync {
    source: Arc<dyn ChainSource>,
    store: Arc<dyn RecordStore<GovernanceProposal>>,
    settings: SyncSettings,
}

impl GovernanceProposalsSync {
    pub fn new(
        source: Arc<dyn ChainSource>,
        store: Arc<dyn RecordStore<GovernanceProposal>>,
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
impl Reconciler for GovernanceProposalsSync {
    type Record = GovernanceProposal;

    fn name(&self) -> &'static str {
        "governance_proposals"
    }

    async fn load_stored(&self) -> Result<Vec<GovernanceProposal>> {
        self.store.load_all().await
    }

    async fn fetch_full(&self) -> Result<Vec<GovernanceProposal>> {
        self.source.proposals().await
    }

    async fn fetch_recent(&self, _stored: &[GovernanceProposal]) -> Result<Vec<GovernanceProposal>> {
        self.source.proposals().await
    }

    fn dirty(
        &self,
        stored: &[GovernanceProposal],
        fetched: Vec<GovernanceProposal>,
    ) -> Vec<GovernanceProposal> {
        let by_id: HashMap<&str, &GovernanceProposal> = stored
            .iter()
            .map(|p| (p.proposal_id.as_str(), p))
            .collect();

        fetched
            .into_iter()
            .filter(|p| match by_id.get(p.proposal_id.as_str()) {
                Some(existing) => p.is_active() || record_changed(*existing, p),
                None => true,
            })
            .collect()
    }

    fn enrich_concurrency(&self) -> usize {
        self.settings.enrich_concurrency
    }

    async fn enrich_one(&self, mut record: GovernanceProposal) -> Result<GovernanceProposal> {
        record.voting_summary = self
            .source
            .proposal_voting_summary(&record.proposal_id)
            .await?;
        Ok(record)
    }

    fn keep_enrichment(
        &self,
        stored: &GovernanceProposal,
        mut fetched: GovernanceProposal,
    ) -> GovernanceProposal {
        if fetched.voting_summary.is_none() {
            fetched.voting_summary = stored.voting_summary.clone();
        }
        fetched
    }

    async fn persist(&self, records: &[GovernanceProposal]) -> Result<()> {
        self.store.upsert(records).await.map(|_| ())
    }

    fn compare(&self, a: &GovernanceProposal, b: &GovernanceProposal) -> Ordering {
        b.block_time.cmp(&a.block_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VotingSummary;
    use crate::reconcile::sync_entity;
    use crate::store::MemoryStore;
    use crate::sync::testing::FakeChain;
    use serde_json::json;

    fn proposal(id: &str, block_time: i64, expired: Option<u32>) -> GovernanceProposal {
        serde_json::from_value(json!({
            "proposal_id": id,
            "proposal_tx_hash": "tx",
            "proposal_index": 0,
            "proposal_type": "TreasuryWithdrawals",
            "proposed_epoch": 500,
            "expired_epoch": expired,
            "block_time": block_time,
        }))
        .unwrap()
    }

    fn summary(yes: u64) -> VotingSummary {
        VotingSummary {
            drep_yes_votes_cast: Some(yes),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn active_proposals_are_re_enriched_each_run() {
        let mut active = proposal("active", 20, None);
        active.voting_summary = Some(summary(1));
        let mut closed = proposal("closed", 10, Some(505));
        closed.voting_summary = Some(summary(7));

        let chain = Arc::new(FakeChain {
            proposals: vec![proposal("active", 20, None), proposal("closed", 10, Some(505))],
            summaries: [
                ("active".to_string(), summary(9)),
                ("closed".to_string(), summary(7)),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::with_rows(vec![closed.clone(), active]));
        let sync = GovernanceProposalsSync::new(chain.clone(), store.clone(), SyncSettings::default());

        let synced = sync_entity(&sync).await.unwrap();

        assert_eq!(chain.summary_calls(), 1);
        assert_eq!(synced.outcome.upserted, 1);
        assert_eq!(synced.records[0].proposal_id, "active");
        assert_eq!(
            synced.records[0].voting_summary.as_ref().unwrap().drep_yes_votes_cast,
            Some(9)
        );
        assert_eq!(synced.records[1], closed);
    }

    #[tokio::test]
    async fn newly_closed_proposal_counts_as_changed() {
        let chain = Arc::new(FakeChain {
            proposals: vec![proposal("p", 1, Some(510))],
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::with_rows(vec![proposal("p", 1, None)]));
        let sync = GovernanceProposalsSync::new(chain.clone(), store.clone(), SyncSettings::default());

        let synced = sync_entity(&sync).await.unwrap();
        assert_eq!(synced.outcome.upserted, 1);
        assert_eq!(store.rows().await[0].expired_epoch, Some(510));
    }

    #[tokio::test]
    async fn failed_summary_lookup_keeps_stored_tally() {
        let mut stored = proposal("active", 20, None);
        stored.voting_summary = Some(summary(42));
        let chain = Arc::new(FakeChain {
            proposals: vec![proposal("active", 20, None)],
            fail_summaries: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::with_rows(vec![stored]));
        let sync = GovernanceProposalsSync::new(chain.clone(), store.clone(), SyncSettings::default());

        let synced = sync_entity(&sync).await.unwrap();

        assert_eq!(chain.summary_calls(), 1);
        assert_eq!(synced.outcome.upserted, 1);
        assert_eq!(
            synced.records[0].voting_summary.as_ref().unwrap().drep_yes_votes_cast,
            Some(42)
        );
        assert_eq!(
            store.rows().await[0].voting_summary.as_ref().unwrap().drep_yes_votes_cast,
            Some(42)
        );
    }
}
