pub mod bins;
pub mod cache;
pub mod diff;
pub mod error;
pub mod model;
pub mod ratelimit;
pub mod reconcile;
pub mod retry;
pub mod source;
pub mod store;
pub mod sync;

pub use bins::{bin_proposals, ProposalBin, ProposalVotes};
pub use cache::TtlCache;
pub use diff::{diff_records, record_changed, should_update};
pub use error::{Result, SyncError};
pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use reconcile::{
    fetch_and_update, merge_by_key, sync_entity, Enriched, Reconciler, SyncOutcome, SyncRecord, Synced,
};
pub use retry::{retry, Backoff, RetryPolicy};
pub use source::ChainSource;
pub use store::{MemoryStore, RecordStore};
pub use sync::{run_entity, Entity, EntityReport, Stores, SyncSettings};
