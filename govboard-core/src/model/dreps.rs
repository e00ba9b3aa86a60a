//! DRep records

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reconcile::SyncRecord;

/// A delegated representative from `/drep_list`. Registration details and
/// metadata are attached from `/drep_info` and `/drep_metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrepRecord {
    pub drep_id: String,
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub has_script: Option<bool>,
    #[serde(default)]
    pub registered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_epoch_no: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_json: Option<Value>,
}

impl DrepRecord {
    pub fn new(drep_id: impl Into<String>) -> Self {
        Self {
            drep_id: drep_id.into(),
            hex: None,
            has_script: None,
            registered: None,
            deposit: None,
            active: None,
            expires_epoch_no: None,
            amount: None,
            meta_url: None,
            meta_hash: None,
            meta_json: None,
        }
    }

    pub fn apply_info(&mut self, info: &DrepDetails) {
        self.deposit = info.deposit.clone();
        self.active = info.active;
        self.expires_epoch_no = info.expires_epoch_no;
        self.amount = info.amount.clone();
        self.meta_url = info.meta_url.clone();
        self.meta_hash = info.meta_hash.clone();
    }

    pub fn apply_metadata(&mut self, metadata: &DrepMetadata) {
        self.meta_json = metadata.meta_json.clone();
    }

    /// Take info and metadata fields still unset here from an earlier
    /// version of this DRep.
    pub fn fill_missing_details(&mut self, previous: &DrepRecord) {
        fn fill<T: Clone>(field: &mut Option<T>, previous: &Option<T>) {
            if field.is_none() {
                field.clone_from(previous);
            }
        }
        fill(&mut self.deposit, &previous.deposit);
        fill(&mut self.active, &previous.active);
        fill(&mut self.expires_epoch_no, &previous.expires_epoch_no);
        fill(&mut self.amount, &previous.amount);
        fill(&mut self.meta_url, &previous.meta_url);
        fill(&mut self.meta_hash, &previous.meta_hash);
        fill(&mut self.meta_json, &previous.meta_json);
    }
}

impl SyncRecord for DrepRecord {
    type Key = String;

    fn key(&self) -> String {
        self.drep_id.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrepDetails {
    pub drep_id: String,
    #[serde(default)]
    pub deposit: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub expires_epoch_no: Option<u32>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub meta_url: Option<String>,
    #[serde(default)]
    pub meta_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrepMetadata {
    pub drep_id: String,
    #[serde(default)]
    pub meta_json: Option<Value>,
    #[serde(default)]
    pub is_valid: Option<bool>,
}
