//! Governance actions and their vote tallies

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reconcile::SyncRecord;

/// A governance action from Koios `/proposal_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceProposal {
    pub proposal_id: String,
    pub proposal_tx_hash: String,
    pub proposal_index: u32,
    pub proposal_type: String,
    #[serde(default)]
    pub proposal_description: Option<Value>,
    #[serde(default)]
    pub deposit: Option<String>,
    #[serde(default)]
    pub return_address: Option<String>,
    pub proposed_epoch: u32,
    #[serde(default)]
    pub ratified_epoch: Option<u32>,
    #[serde(default)]
    pub enacted_epoch: Option<u32>,
    #[serde(default)]
    pub dropped_epoch: Option<u32>,
    #[serde(default)]
    pub expired_epoch: Option<u32>,
    #[serde(default)]
    pub expiration: Option<u32>,
    #[serde(default)]
    pub meta_url: Option<String>,
    #[serde(default)]
    pub meta_hash: Option<String>,
    #[serde(default)]
    pub meta_json: Option<Value>,
    #[serde(default)]
    pub meta_comment: Option<String>,
    #[serde(default)]
    pub meta_language: Option<String>,
    #[serde(default)]
    pub meta_is_valid: Option<bool>,
    #[serde(default)]
    pub withdrawal: Option<Value>,
    #[serde(default)]
    pub param_proposal: Option<Value>,
    pub block_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_summary: Option<VotingSummary>,
}

impl GovernanceProposal {
    /// Still open for votes: no terminal epoch has been recorded.
    pub fn is_active(&self) -> bool {
        self.ratified_epoch.is_none()
            && self.enacted_epoch.is_none()
            && self.dropped_epoch.is_none()
            && self.expired_epoch.is_none()
    }

    pub fn status(&self) -> ProposalStatus {
        if self.enacted_epoch.is_some() {
            ProposalStatus::Enacted
        } else if self.ratified_epoch.is_some() {
            ProposalStatus::Ratified
        } else if self.dropped_epoch.is_some() {
            ProposalStatus::Dropped
        } else if self.expired_epoch.is_some() {
            ProposalStatus::Expired
        } else {
            ProposalStatus::Active
        }
    }

    /// Title from CIP-108 metadata (`meta_json.body.title`), falling back to
    /// the proposal id.
    pub fn title(&self) -> String {
        self.meta_json
            .as_ref()
            .and_then(|meta| meta.pointer("/body/title"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| self.proposal_id.clone())
    }
}

impl SyncRecord for GovernanceProposal {
    type Key = String;

    fn key(&self) -> String {
        self.proposal_id.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Active,
    Ratified,
    Enacted,
    Dropped,
    Expired,
}

/// Per-role vote tallies from `/proposal_voting_summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingSummary {
    pub epoch_no: Option<u32>,
    pub drep_yes_votes_cast: Option<u64>,
    pub drep_yes_vote_power: Option<String>,
    pub drep_yes_pct: Option<f64>,
    pub drep_no_votes_cast: Option<u64>,
    pub drep_no_vote_power: Option<String>,
    pub drep_no_pct: Option<f64>,
    pub drep_abstain_votes_cast: Option<u64>,
    pub drep_always_abstain_vote_power: Option<String>,
    pub drep_always_no_confidence_vote_power: Option<String>,
    pub pool_yes_votes_cast: Option<u64>,
    pub pool_yes_vote_power: Option<String>,
    pub pool_yes_pct: Option<f64>,
    pub pool_no_votes_cast: Option<u64>,
    pub pool_no_vote_power: Option<String>,
    pub pool_no_pct: Option<f64>,
    pub pool_abstain_votes_cast: Option<u64>,
    pub committee_yes_votes_cast: Option<u64>,
    pub committee_yes_pct: Option<f64>,
    pub committee_no_votes_cast: Option<u64>,
    pub committee_no_pct: Option<f64>,
    pub committee_abstain_votes_cast: Option<u64>,
}

impl VotingSummary {
    pub fn yes_votes(&self) -> u64 {
        sum(&[
            self.drep_yes_votes_cast,
            self.pool_yes_votes_cast,
            self.committee_yes_votes_cast,
        ])
    }

    pub fn no_votes(&self) -> u64 {
        sum(&[
            self.drep_no_votes_cast,
            self.pool_no_votes_cast,
            self.committee_no_votes_cast,
        ])
    }

    pub fn abstain_votes(&self) -> u64 {
        sum(&[
            self.drep_abstain_votes_cast,
            self.pool_abstain_votes_cast,
            self.committee_abstain_votes_cast,
        ])
    }
}

fn sum(counts: &[Option<u64>]) -> u64 {
    counts.iter().flatten().sum()
}
