//! Run a reconciler by entity name, as the CLI and the sync route do.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    sync_chain_tip, CommitteeSync, DrepSync, GovernanceProposalsSync, NetworkTotalsSync, SpoSync,
    SyncSettings,
};
use crate::error::{Result, SyncError};
use crate::model::{
    ChainTip, CommitteeMember, DrepRecord, GovernanceProposal, NetworkTotals, SpoRecord,
};
use crate::reconcile::{sync_entity, Reconciler, SyncOutcome};
use crate::source::ChainSource;
use crate::store::{MemoryStore, RecordStore};

/// A synced table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Entity {
    NetworkTotals,
    Proposals,
    Spos,
    Dreps,
    Committee,
    ChainTip,
}

impl Entity {
    /// Every entity, in the order `sync all` runs them.
    pub const ALL: [Entity; 6] = [
        Entity::ChainTip,
        Entity::NetworkTotals,
        Entity::Proposals,
        Entity::Spos,
        Entity::Dreps,
        Entity::Committee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkTotals => "network-totals",
            Self::Proposals => "proposals",
            Self::Spos => "spos",
            Self::Dreps => "dreps",
            Self::Committee => "committee",
            Self::ChainTip => "chain-tip",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace('_', "-").as_str() {
            "network-totals" | "totals" => Ok(Self::NetworkTotals),
            "proposals" | "governance-proposals" => Ok(Self::Proposals),
            "spos" | "pools" => Ok(Self::Spos),
            "dreps" => Ok(Self::Dreps),
            "committee" => Ok(Self::Committee),
            "chain-tip" | "tip" => Ok(Self::ChainTip),
            other => Err(SyncError::config(format!("unknown entity '{other}'"))),
        }
    }
}

/// One store per synced table.
#[derive(Clone)]
pub struct Stores {
    pub chain_tip: Arc<dyn RecordStore<ChainTip>>,
    pub network_totals: Arc<dyn RecordStore<NetworkTotals>>,
    pub proposals: Arc<dyn RecordStore<GovernanceProposal>>,
    pub spos: Arc<dyn RecordStore<SpoRecord>>,
    pub dreps: Arc<dyn RecordStore<DrepRecord>>,
    pub committee: Arc<dyn RecordStore<CommitteeMember>>,
}

impl Stores {
    /// Empty in-memory stores; every reconciler takes its full-fetch path.
    pub fn memory() -> Self {
        Self {
            chain_tip: Arc::new(MemoryStore::<ChainTip>::new()),
            network_totals: Arc::new(MemoryStore::<NetworkTotals>::new()),
            proposals: Arc::new(MemoryStore::<GovernanceProposal>::new()),
            spos: Arc::new(MemoryStore::<SpoRecord>::new()),
            dreps: Arc::new(MemoryStore::<DrepRecord>::new()),
            committee: Arc::new(MemoryStore::<CommitteeMember>::new()),
        }
    }
}

/// Counters and merged rows of one entity sync.
#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    pub entity: Entity,
    pub outcome: SyncOutcome,
    pub rows: Value,
}

pub async fn run_entity(
    entity: Entity,
    source: &Arc<dyn ChainSource>,
    stores: &Stores,
    settings: &SyncSettings,
) -> Result<EntityReport> {
    let source = Arc::clone(source);
    let settings = settings.clone();
    match entity {
        Entity::ChainTip => {
            let tip = sync_chain_tip(&source, &stores.chain_tip).await?;
            let outcome = SyncOutcome {
                stored: 0,
                fetched: 1,
                upserted: 1,
                returned: 1,
                full_refresh: true,
            };
            report(entity, outcome, vec![tip])
        }
        Entity::NetworkTotals => {
            let sync = NetworkTotalsSync::new(source, stores.network_totals.clone(), settings);
            run(entity, &sync).await
        }
        Entity::Proposals => {
            let sync = GovernanceProposalsSync::new(source, stores.proposals.clone(), settings);
            run(entity, &sync).await
        }
        Entity::Spos => {
            let sync = SpoSync::new(source, stores.spos.clone(), settings);
            run(entity, &sync).await
        }
        Entity::Dreps => {
            let sync = DrepSync::new(source, stores.dreps.clone(), settings);
            run(entity, &sync).await
        }
        Entity::Committee => {
            let sync = CommitteeSync::new(source, stores.committee.clone());
            run(entity, &sync).await
        }
    }
}

async fn run<R: Reconciler>(entity: Entity, reconciler: &R) -> Result<EntityReport> {
    let synced = sync_entity(reconciler).await?;
    report(entity, synced.outcome, synced.records)
}

fn report<T: Serialize>(entity: Entity, outcome: SyncOutcome, rows: Vec<T>) -> Result<EntityReport> {
    let rows = serde_json::to_value(rows).map_err(|e| SyncError::json(entity.as_str(), e))?;
    Ok(EntityReport {
        entity,
        outcome,
        rows,
    })
}
