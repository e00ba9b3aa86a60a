//! The chain-data endpoints the reconcilers depend on.
//!
//! `govboard-sources` implements this over the Koios REST API. Tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    ChainTip, CommitteeInfo, DrepDetails, DrepMetadata, DrepRecord, EpochSummary,
    GovernanceProposal, NetworkTotals, PoolDetails, SpoRecord, VotingSummary,
};

#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn tip(&self) -> Result<ChainTip>;

    /// Totals for one epoch, or every epoch when `epoch_no` is `None`.
    async fn totals(&self, epoch_no: Option<u32>) -> Result<Vec<NetworkTotals>>;

    async fn epoch_info(&self, epoch_no: u32) -> Result<Option<EpochSummary>>;

    async fn proposals(&self) -> Result<Vec<GovernanceProposal>>;

    async fn proposal_voting_summary(&self, proposal_id: &str) -> Result<Option<VotingSummary>>;

    async fn pool_list_page(&self, offset: usize, limit: usize) -> Result<Vec<SpoRecord>>;

    async fn pool_info(&self, pool_ids: &[String]) -> Result<Vec<PoolDetails>>;

    async fn drep_list_page(&self, offset: usize, limit: usize) -> Result<Vec<DrepRecord>>;

    async fn drep_info(&self, drep_ids: &[String]) -> Result<Vec<DrepDetails>>;

    async fn drep_metadata(&self, drep_ids: &[String]) -> Result<Vec<DrepMetadata>>;

    async fn committee_info(&self) -> Result<Vec<CommitteeInfo>>;
}
