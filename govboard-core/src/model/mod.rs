//! Records mirrored from external APIs and the dashboard's own entities

pub mod committee;
pub mod dreps;
pub mod github;
pub mod governance;
pub mod location;
pub mod network;
pub mod npm;
pub mod pools;
pub mod projects;
pub mod validation;

pub use committee::{CommitteeInfo, CommitteeMember, CommitteeMemberInfo};
pub use dreps::{DrepDetails, DrepMetadata, DrepRecord};
pub use github::{ExistingIds, IngestBatch, IngestReport, MinCommit, MinIssue, MinPull};
pub use governance::{GovernanceProposal, ProposalStatus, VotingSummary};
pub use location::PoolLocation;
pub use network::{ChainTip, EpochSummary, NetworkTotals};
pub use npm::NpmPackageStats;
pub use pools::{PoolDetails, SpoRecord};
pub use projects::{Principal, PrincipalKind, Project, ProjectInput, ProjectRole, Role};
pub use validation::ValidationError;
