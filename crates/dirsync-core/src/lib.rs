//! # dirsync core
//!
//! Shared foundation for the dirsync synchronization job: the capability
//! traits consumed by the reconciliation engine, the domain types exchanged
//! across crate boundaries, the error taxonomy, and the two pure helper
//! transforms (group-spec parsing and severity encoding).
//!
//! The crates implementing the capabilities are `dirsync-ldap` (directory
//! side) and `dirsync-zabbix` (target side); `dirsync-engine` drives them.

pub mod config;
pub mod error;
pub mod ids;
pub mod severity;
pub mod traits;
pub mod types;

// Re-exports
pub use config::{MediaPolicy, SyncPolicy};
pub use error::{SyncError, SyncResult};
pub use ids::{AccountId, GroupId, MediaTypeId};
pub use traits::{DirectoryClient, TargetClient};
pub use types::{
    ApiVersion, CaseFoldPolicy, DirectoryMember, GroupSpec, NewAccount, TargetAccount, TargetGroup,
};
