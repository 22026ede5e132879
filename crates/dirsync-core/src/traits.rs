//! Capability traits consumed by the reconciliation engine.
//!
//! The engine is the only caller; these traits are the full extent of the
//! I/O it performs. Both sides are driven strictly sequentially.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::ids::{AccountId, GroupId, MediaTypeId};
use crate::types::{ApiVersion, DirectoryMember, NewAccount, TargetAccount, TargetGroup};

/// Read-only view of the directory service (LDAP/Active Directory), the
/// authoritative source of group membership for each run.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Establish and bind the directory connection.
    ///
    /// A bind failure is fatal for the whole run.
    async fn bind(&self) -> SyncResult<()>;

    /// Tear the connection down at the end of the run.
    async fn unbind(&self) -> SyncResult<()>;

    /// Resolve the members of a named group.
    ///
    /// Returns `None` when the group does not exist (callers skip it with a
    /// log line) and `Some` with an empty vector when the group exists but
    /// has no members — the empty case may still drive orphan cleanup.
    /// Identities are returned raw; case folding is the caller's concern.
    async fn resolve_group_members(
        &self,
        group: &str,
    ) -> SyncResult<Option<Vec<DirectoryMember>>>;

    /// Look up the given name of an entry; absence is not an error.
    async fn resolve_given_name(&self, dn: &str) -> SyncResult<Option<String>>;

    /// Look up the surname of an entry; absence is not an error.
    async fn resolve_surname(&self, dn: &str) -> SyncResult<Option<String>>;

    /// Look up a media address attribute of an entry; absence is not an error.
    async fn resolve_media(&self, dn: &str, attribute: &str) -> SyncResult<Option<String>>;

    /// Expand wildcard group-name patterns into concrete group names.
    /// Referral entries are filtered out.
    async fn resolve_groups_by_wildcard(&self, patterns: &[String]) -> SyncResult<Vec<String>>;
}

/// Account, group and media management in the target system.
///
/// Version-dependent API quirks (membership-update primitives, attribute
/// renames) are the implementation's concern: it negotiates the version at
/// login and picks the right calls internally.
#[async_trait]
pub trait TargetClient: Send + Sync {
    /// Authenticate against the target system.
    ///
    /// A login failure is fatal for the whole run.
    async fn login(&self) -> SyncResult<()>;

    /// The API version negotiated at login.
    async fn api_version(&self) -> SyncResult<ApiVersion>;

    /// All accounts in the target system.
    async fn list_accounts(&self) -> SyncResult<Vec<TargetAccount>>;

    /// Resolve a username to its account id, if the account exists.
    async fn get_account_id(&self, username: &str) -> SyncResult<Option<AccountId>>;

    /// All user groups in the target system.
    async fn list_groups(&self) -> SyncResult<Vec<TargetGroup>>;

    /// Create a user group, returning its id.
    async fn create_group(&self, name: &str) -> SyncResult<GroupId>;

    /// Usernames currently in a group.
    async fn list_group_members(&self, group: &GroupId) -> SyncResult<Vec<String>>;

    /// Create an account, returning its id.
    async fn create_account(&self, account: &NewAccount) -> SyncResult<AccountId>;

    /// Delete an account outright.
    async fn delete_account(&self, id: &AccountId) -> SyncResult<()>;

    /// Add an existing account to a group.
    async fn add_to_group(&self, group: &GroupId, account: &AccountId) -> SyncResult<()>;

    /// Remove an account from a group without deleting it.
    async fn remove_from_group(&self, group: &GroupId, account: &AccountId) -> SyncResult<()>;

    /// Resolve a media type by its description.
    ///
    /// Fails with `MediaTypeNotFound` when nothing matches and
    /// `AmbiguousMediaType` when more than one media type does.
    async fn resolve_media_type_id(&self, description: &str) -> SyncResult<MediaTypeId>;

    /// Create or replace the contact-media entry of an account.
    async fn upsert_media(
        &self,
        account: &AccountId,
        media_type: &MediaTypeId,
        sendto: &str,
        options: &[(String, String)],
    ) -> SyncResult<()>;
}
