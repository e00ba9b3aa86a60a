//! Postgres persistence for govboard.
//!
//! Synced entities live in JSONB tables behind [`PgRecordStore`]; everything
//! else has a typed repository under [`repos`].

pub mod error;
pub mod migrations;
pub mod pool;
pub mod records;
pub mod repos;

pub use error::{DbError, DbResult};
pub use pool::{create_pool, create_pool_with_options, lazy_pool};
pub use records::{EntityStores, PgRecordStore, TableSpec};
pub use repos::{GithubRepo, LocationRepo, NpmRepo, ProjectRepo, RoleRepo};
