//! Stake pool records

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reconcile::SyncRecord;

/// A stake pool as listed by `/pool_list`, plus the live figures attached
/// from `/pool_info` during enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoRecord {
    pub pool_id_bech32: String,
    #[serde(default)]
    pub pool_id_hex: Option<String>,
    #[serde(default)]
    pub active_epoch_no: Option<u32>,
    #[serde(default)]
    pub margin: Option<f64>,
    #[serde(default)]
    pub fixed_cost: Option<String>,
    #[serde(default)]
    pub pledge: Option<String>,
    #[serde(default)]
    pub reward_addr: Option<String>,
    #[serde(default)]
    pub owners: Option<Vec<String>>,
    #[serde(default)]
    pub relays: Option<Value>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub meta_url: Option<String>,
    #[serde(default)]
    pub meta_hash: Option<String>,
    #[serde(default)]
    pub pool_status: Option<String>,
    #[serde(default)]
    pub retiring_epoch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_stake: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_delegators: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_saturation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_power: Option<String>,
}

impl SpoRecord {
    pub fn new(pool_id_bech32: impl Into<String>) -> Self {
        Self {
            pool_id_bech32: pool_id_bech32.into(),
            pool_id_hex: None,
            active_epoch_no: None,
            margin: None,
            fixed_cost: None,
            pledge: None,
            reward_addr: None,
            owners: None,
            relays: None,
            ticker: None,
            meta_url: None,
            meta_hash: None,
            pool_status: None,
            retiring_epoch: None,
            meta_json: None,
            live_stake: None,
            live_delegators: None,
            live_saturation: None,
            block_count: None,
            voting_power: None,
        }
    }

    pub fn apply_details(&mut self, details: &PoolDetails) {
        self.meta_json = details.meta_json.clone();
        self.live_stake = details.live_stake.clone();
        self.live_delegators = details.live_delegators;
        self.live_saturation = details.live_saturation;
        self.block_count = details.block_count;
        self.voting_power = details.voting_power.clone();
    }

    /// Copy the `/pool_info` figures from an earlier version of this pool.
    pub fn keep_details(&mut self, previous: &SpoRecord) {
        self.meta_json = previous.meta_json.clone();
        self.live_stake = previous.live_stake.clone();
        self.live_delegators = previous.live_delegators;
        self.live_saturation = previous.live_saturation;
        self.block_count = previous.block_count;
        self.voting_power = previous.voting_power.clone();
    }
}

impl SyncRecord for SpoRecord {
    type Key = String;

    fn key(&self) -> String {
        self.pool_id_bech32.clone()
    }
}

/// The `/pool_info` fields kept on a pool row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolDetails {
    pub pool_id_bech32: String,
    #[serde(default)]
    pub meta_json: Option<Value>,
    #[serde(default)]
    pub live_stake: Option<String>,
    #[serde(default)]
    pub live_delegators: Option<u64>,
    #[serde(default)]
    pub live_saturation: Option<f64>,
    #[serde(default)]
    pub block_count: Option<u64>,
    #[serde(default)]
    pub voting_power: Option<String>,
}
