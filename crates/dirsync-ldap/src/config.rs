//! LDAP client configuration
//!
//! Connection settings plus the filter templates used to resolve groups and
//! members. Templates default per directory kind and can be overridden
//! individually; each carries one `%s` placeholder.

use serde::{Deserialize, Serialize};

use dirsync_core::error::{SyncError, SyncResult};

/// Kind of directory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    ActiveDirectory,
    OpenLdap,
}

/// How an OpenLDAP group stores its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStyle {
    /// `posixGroup`: member values are uids, resolved with a user search.
    PosixGroup,
    /// `groupOfNames`: member values are DNs, fetched directly.
    GroupOfNames,
}

/// Configuration for the LDAP directory client.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Server URI (`ldap://host:389` or `ldaps://host:636`).
    pub uri: String,

    /// Search base for all subtree operations.
    pub base_dn: String,

    /// Bind DN.
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub ignore_tls_errors: bool,

    /// Directory kind (selects filter defaults and membership strategies).
    #[serde(default = "default_kind")]
    pub kind: DirectoryKind,

    /// Resolve membership through the member-of closure instead of the
    /// group's member attribute. Active Directory only.
    #[serde(default)]
    pub recursive: bool,

    /// Exclude disabled accounts. Only effective together with `recursive`.
    #[serde(default)]
    pub skip_disabled: bool,

    /// OpenLDAP group style.
    #[serde(default = "default_group_style")]
    pub group_style: GroupStyle,

    /// Override for the group search filter template.
    #[serde(default)]
    pub group_filter: Option<String>,

    /// Override for the user filter (fragment in Active Directory mode,
    /// template with `%s` in OpenLDAP posixgroup mode).
    #[serde(default)]
    pub user_filter: Option<String>,

    /// Override for the disabled-account filter fragment.
    #[serde(default)]
    pub disabled_filter: Option<String>,

    /// Override for the member-of closure filter template.
    #[serde(default)]
    pub member_of_filter: Option<String>,

    /// Override for the group attribute holding member values.
    #[serde(default)]
    pub group_member_attribute: Option<String>,

    /// Override for the attribute used as account identity.
    #[serde(default)]
    pub uid_attribute: Option<String>,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("uri", &self.uri)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("ignore_tls_errors", &self.ignore_tls_errors)
            .field("kind", &self.kind)
            .field("recursive", &self.recursive)
            .field("skip_disabled", &self.skip_disabled)
            .field("group_style", &self.group_style)
            .finish()
    }
}

fn default_kind() -> DirectoryKind {
    DirectoryKind::OpenLdap
}

fn default_group_style() -> GroupStyle {
    GroupStyle::PosixGroup
}

// Active Directory filter defaults. The member-of template uses the
// LDAP_MATCHING_RULE_IN_CHAIN extended match, available on Windows Server
// 2003 SP2 and later domain controllers.
const AD_GROUP_FILTER: &str = "(&(objectClass=group)(name=%s))";
const AD_USER_FILTER: &str = "(objectClass=user)(objectCategory=Person)";
const AD_DISABLED_FILTER: &str = "(!(userAccountControl:1.2.840.113556.1.4.803:=2))";
const AD_MEMBER_OF_FILTER: &str = "(memberOf:1.2.840.113556.1.4.1941:=%s)";
const AD_MEMBER_ATTRIBUTE: &str = "member";
const AD_UID_ATTRIBUTE: &str = "sAMAccountName";

const OPENLDAP_POSIX_GROUP_FILTER: &str = "(&(objectClass=posixGroup)(cn=%s))";
const OPENLDAP_GON_GROUP_FILTER: &str = "(&(objectClass=groupOfNames)(cn=%s))";
const OPENLDAP_USER_FILTER: &str = "(&(objectClass=posixAccount)(uid=%s))";
const OPENLDAP_POSIX_MEMBER_ATTRIBUTE: &str = "memberUid";
const OPENLDAP_GON_MEMBER_ATTRIBUTE: &str = "member";
const OPENLDAP_UID_ATTRIBUTE: &str = "uid";

/// The filter templates and attribute names in effect for one configuration,
/// with per-kind defaults applied.
#[derive(Debug, Clone)]
pub struct FilterSet {
    pub group: String,
    pub user: String,
    pub disabled: String,
    pub member_of: String,
    pub member_attribute: String,
    pub uid_attribute: String,
}

impl LdapConfig {
    /// Create a new config with required fields.
    pub fn new(
        uri: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            ignore_tls_errors: false,
            kind: default_kind(),
            recursive: false,
            skip_disabled: false,
            group_style: default_group_style(),
            group_filter: None,
            user_filter: None,
            disabled_filter: None,
            member_of_filter: None,
            group_member_attribute: None,
            uid_attribute: None,
        }
    }

    /// Set the bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Set the directory kind.
    #[must_use]
    pub fn with_kind(mut self, kind: DirectoryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Enable recursive member-of resolution.
    #[must_use]
    pub fn with_recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Exclude disabled accounts from recursive queries.
    #[must_use]
    pub fn with_skip_disabled(mut self) -> Self {
        self.skip_disabled = true;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if !self.uri.starts_with("ldap://") && !self.uri.starts_with("ldaps://") {
            return Err(SyncError::invalid_configuration(format!(
                "ldap uri must start with ldap:// or ldaps://, got '{}'",
                self.uri
            )));
        }
        if self.base_dn.is_empty() {
            return Err(SyncError::invalid_configuration("ldap base_dn is empty"));
        }
        if self.bind_dn.is_empty() {
            return Err(SyncError::invalid_configuration("ldap bind_dn is empty"));
        }
        if self.recursive && self.kind != DirectoryKind::ActiveDirectory {
            return Err(SyncError::invalid_configuration(
                "recursive membership resolution requires kind = \"activedirectory\"",
            ));
        }
        Ok(())
    }

    /// The filter templates in effect, with per-kind defaults applied.
    pub fn filters(&self) -> FilterSet {
        let pick = |over: &Option<String>, default: &str| {
            over.clone().unwrap_or_else(|| default.to_string())
        };
        match self.kind {
            DirectoryKind::ActiveDirectory => FilterSet {
                group: pick(&self.group_filter, AD_GROUP_FILTER),
                user: pick(&self.user_filter, AD_USER_FILTER),
                disabled: pick(&self.disabled_filter, AD_DISABLED_FILTER),
                member_of: pick(&self.member_of_filter, AD_MEMBER_OF_FILTER),
                member_attribute: pick(&self.group_member_attribute, AD_MEMBER_ATTRIBUTE),
                uid_attribute: pick(&self.uid_attribute, AD_UID_ATTRIBUTE),
            },
            DirectoryKind::OpenLdap => {
                let (group_default, member_default) = match self.group_style {
                    GroupStyle::PosixGroup => {
                        (OPENLDAP_POSIX_GROUP_FILTER, OPENLDAP_POSIX_MEMBER_ATTRIBUTE)
                    }
                    GroupStyle::GroupOfNames => {
                        (OPENLDAP_GON_GROUP_FILTER, OPENLDAP_GON_MEMBER_ATTRIBUTE)
                    }
                };
                FilterSet {
                    group: pick(&self.group_filter, group_default),
                    user: pick(&self.user_filter, OPENLDAP_USER_FILTER),
                    disabled: String::new(),
                    member_of: String::new(),
                    member_attribute: pick(&self.group_member_attribute, member_default),
                    uid_attribute: pick(&self.uid_attribute, OPENLDAP_UID_ATTRIBUTE),
                }
            }
        }
    }
}
