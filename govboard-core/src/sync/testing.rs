//! In-memory chain source for reconciler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SyncError};
use crate::model::*;
use crate::source::ChainSource;

#[derive(Default)]
pub struct FakeChain {
    pub tip_epoch: u32,
    pub totals: Vec<NetworkTotals>,
    pub epoch_infos: HashMap<u32, EpochSummary>,
    pub fail_epoch_info: bool,
    pub proposals: Vec<GovernanceProposal>,
    pub summaries: HashMap<String, VotingSummary>,
    pub fail_summaries: bool,
    pub pools: Vec<SpoRecord>,
    pub pool_details: Vec<PoolDetails>,
    pub fail_pool_info: bool,
    pub dreps: Vec<DrepRecord>,
    pub drep_details: Vec<DrepDetails>,
    pub drep_meta: Vec<DrepMetadata>,
    pub fail_drep_info: bool,
    pub fail_drep_metadata: bool,
    pub committee: Vec<CommitteeInfo>,
    pub totals_requests: Mutex<Vec<Option<u32>>>,
    pub summary_calls: AtomicUsize,
    pub pool_info_calls: AtomicUsize,
}

impl FakeChain {
    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainSource for FakeChain {
    async fn tip(&self) -> Result<ChainTip> {
        Ok(ChainTip {
            hash: "tip".into(),
            epoch_no: self.tip_epoch,
            abs_slot: 1,
            epoch_slot: 1,
            block_height: 1,
            block_time: 1,
        })
    }

    async fn totals(&self, epoch_no: Option<u32>) -> Result<Vec<NetworkTotals>> {
        self.totals_requests.lock().unwrap().push(epoch_no);
        Ok(self
            .totals
            .iter()
            .filter(|t| epoch_no.map_or(true, |e| t.epoch_no == e))
            .cloned()
            .collect())
    }

    async fn epoch_info(&self, epoch_no: u32) -> Result<Option<EpochSummary>> {
        if self.fail_epoch_info {
            return Err(SyncError::source("epoch_info", "HTTP 503", true));
        }
        Ok(self.epoch_infos.get(&epoch_no).cloned())
    }

    async fn proposals(&self) -> Result<Vec<GovernanceProposal>> {
        Ok(self.proposals.clone())
    }

    async fn proposal_voting_summary(&self, proposal_id: &str) -> Result<Option<VotingSummary>> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_summaries {
            return Err(SyncError::source("proposal_voting_summary", "HTTP 503", true));
        }
        Ok(self.summaries.get(proposal_id).cloned())
    }

    async fn pool_list_page(&self, offset: usize, limit: usize) -> Result<Vec<SpoRecord>> {
        Ok(self.pools.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn pool_info(&self, pool_ids: &[String]) -> Result<Vec<PoolDetails>> {
        self.pool_info_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pool_info {
            return Err(SyncError::source("pool_info", "HTTP 502", true));
        }
        Ok(self
            .pool_details
            .iter()
            .filter(|d| pool_ids.contains(&d.pool_id_bech32))
            .cloned()
            .collect())
    }

    async fn drep_list_page(&self, offset: usize, limit: usize) -> Result<Vec<DrepRecord>> {
        Ok(self.dreps.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn drep_info(&self, drep_ids: &[String]) -> Result<Vec<DrepDetails>> {
        if self.fail_drep_info {
            return Err(SyncError::source("drep_info", "HTTP 502", true));
        }
        Ok(self
            .drep_details
            .iter()
            .filter(|d| drep_ids.contains(&d.drep_id))
            .cloned()
            .collect())
    }

    async fn drep_metadata(&self, drep_ids: &[String]) -> Result<Vec<DrepMetadata>> {
        if self.fail_drep_metadata {
            return Err(SyncError::source("drep_metadata", "HTTP 502", true));
        }
        Ok(self
            .drep_meta
            .iter()
            .filter(|d| drep_ids.contains(&d.drep_id))
            .cloned()
            .collect())
    }

    async fn committee_info(&self) -> Result<Vec<CommitteeInfo>> {
        Ok(self.committee.clone())
    }
}
