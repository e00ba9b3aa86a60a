//! Chain tip and per-epoch network totals

use serde::{Deserialize, Serialize};

use crate::reconcile::SyncRecord;

/// Current chain tip as reported by Koios `/tip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTip {
    pub hash: String,
    pub epoch_no: u32,
    pub abs_slot: u64,
    pub epoch_slot: u64,
    #[serde(alias = "block_no")]
    pub block_height: u64,
    pub block_time: i64,
}

impl SyncRecord for ChainTip {
    type Key = u8;

    /// The tip table holds a single row.
    fn key(&self) -> u8 {
        1
    }
}

/// Lovelace totals for one epoch (`/totals`). Amounts stay as the decimal
/// strings Koios returns, they overflow `i64` for supply-sized values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkTotals {
    pub epoch_no: u32,
    #[serde(default)]
    pub circulation: Option<String>,
    #[serde(default)]
    pub treasury: Option<String>,
    #[serde(default)]
    pub reward: Option<String>,
    #[serde(default)]
    pub supply: Option<String>,
    #[serde(default)]
    pub reserves: Option<String>,
    #[serde(default)]
    pub fees: Option<String>,
    #[serde(default)]
    pub deposits_stake: Option<String>,
    #[serde(default)]
    pub deposits_drep: Option<String>,
    #[serde(default)]
    pub deposits_proposal: Option<String>,
    /// Attached during enrichment, never part of the freshness diff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_info: Option<EpochSummary>,
}

impl NetworkTotals {
    pub fn new(epoch_no: u32) -> Self {
        Self {
            epoch_no,
            circulation: None,
            treasury: None,
            reward: None,
            supply: None,
            reserves: None,
            fees: None,
            deposits_stake: None,
            deposits_drep: None,
            deposits_proposal: None,
            epoch_info: None,
        }
    }
}

impl SyncRecord for NetworkTotals {
    type Key = u32;

    fn key(&self) -> u32 {
        self.epoch_no
    }
}

/// Subset of `/epoch_info` attached to a totals row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch_no: u32,
    #[serde(default)]
    pub out_sum: Option<String>,
    #[serde(default)]
    pub fees: Option<String>,
    #[serde(default)]
    pub tx_count: Option<u64>,
    #[serde(default)]
    pub blk_count: Option<u64>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub active_stake: Option<String>,
    #[serde(default)]
    pub total_rewards: Option<String>,
}
