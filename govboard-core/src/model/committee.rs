//! Constitutional committee membership

use serde::{Deserialize, Serialize};

use crate::reconcile::SyncRecord;

/// Shape of `/committee_info`: the enacting proposal, quorum and members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeInfo {
    #[serde(default)]
    pub proposal_id: Option<String>,
    #[serde(default)]
    pub quorum_numerator: Option<u64>,
    #[serde(default)]
    pub quorum_denominator: Option<u64>,
    #[serde(default)]
    pub members: Vec<CommitteeMemberInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeMemberInfo {
    pub cc_cold_id: String,
    #[serde(default)]
    pub cc_hot_id: Option<String>,
    #[serde(default)]
    pub cc_cold_hex: Option<String>,
    #[serde(default)]
    pub cc_hot_hex: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub expiration_epoch: Option<u32>,
}

/// One stored committee row, keyed by cold credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeMember {
    pub cc_cold_id: String,
    #[serde(default)]
    pub cc_hot_id: Option<String>,
    #[serde(default)]
    pub cc_cold_hex: Option<String>,
    #[serde(default)]
    pub cc_hot_hex: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub expiration_epoch: Option<u32>,
    #[serde(default)]
    pub quorum_numerator: Option<u64>,
    #[serde(default)]
    pub quorum_denominator: Option<u64>,
}

impl CommitteeInfo {
    pub fn into_members(self) -> Vec<CommitteeMember> {
        let (numerator, denominator) = (self.quorum_numerator, self.quorum_denominator);
        self.members
            .into_iter()
            .map(|m| CommitteeMember {
                cc_cold_id: m.cc_cold_id,
                cc_hot_id: m.cc_hot_id,
                cc_cold_hex: m.cc_cold_hex,
                cc_hot_hex: m.cc_hot_hex,
                status: m.status,
                expiration_epoch: m.expiration_epoch,
                quorum_numerator: numerator,
                quorum_denominator: denominator,
            })
            .collect()
    }
}

impl SyncRecord for CommitteeMember {
    type Key = String;

    fn key(&self) -> String {
        self.cc_cold_id.clone()
    }
}
