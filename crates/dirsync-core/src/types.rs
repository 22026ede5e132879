//! Domain types exchanged between the engine and its two clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::GroupId;

/// A configured group to synchronize, parsed from a group specification
/// string of the form `"<name>:<digits>"` or plain `"<name>"`.
///
/// The optional role id is a target-system role/type reference applied only
/// at account-creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Group name, the reconciliation key on both sides.
    pub name: String,
    /// Role id for accounts created through this group.
    pub role_id: Option<String>,
}

impl GroupSpec {
    /// Parse a group specification string.
    ///
    /// A trailing `:<digits>` suffix splits into name and role id; any other
    /// string is a valid bare group name (there is no error case).
    pub fn parse(spec: &str) -> Self {
        if let Some((name, role)) = spec.rsplit_once(':') {
            let role = role.trim();
            if !role.is_empty() && role.chars().all(|c| c.is_ascii_digit()) {
                return GroupSpec {
                    name: name.trim().to_string(),
                    role_id: Some(role.to_string()),
                };
            }
        }
        GroupSpec {
            name: spec.to_string(),
            role_id: None,
        }
    }
}

/// A group member as resolved on the directory side.
///
/// The identity is returned raw; case folding is the engine's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMember {
    /// Value of the configured uid attribute, used as the target username.
    pub identity: String,
    /// Distinguished name, used for follow-up attribute lookups.
    pub dn: String,
}

/// An account in the target system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAccount {
    pub username: String,
    pub id: crate::ids::AccountId,
}

/// A user group in the target system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroup {
    pub name: String,
    pub id: GroupId,
}

/// Request to create a new account in the target system.
#[derive(Clone)]
pub struct NewAccount {
    /// Username (already case-folded per the run-wide policy).
    pub username: String,
    /// Given name from the directory, empty when the attribute is absent.
    pub given_name: String,
    /// Surname from the directory, empty when the attribute is absent.
    pub surname: String,
    /// Generated starting password.
    pub password: String,
    /// Role id from the group spec, if any.
    pub role_id: Option<String>,
    /// Group the account is created into.
    pub group_id: GroupId,
    /// Pass-through account options from configuration.
    pub options: Vec<(String, String)>,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("given_name", &self.given_name)
            .field("surname", &self.surname)
            .field("password", &"***REDACTED***")
            .field("role_id", &self.role_id)
            .field("group_id", &self.group_id)
            .field("options", &self.options)
            .finish()
    }
}

/// Run-wide username case-folding policy.
///
/// Both membership snapshots must be folded with the same policy before they
/// are compared; the policy is configuration-wide, not per-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFoldPolicy {
    /// Keep account ids verbatim end-to-end.
    Preserve,
    /// Fold every compared and stored username to lowercase.
    Lowercase,
}

impl CaseFoldPolicy {
    /// Build the policy from the `preserve_account_ids` flag.
    pub fn from_preserve_flag(preserve: bool) -> Self {
        if preserve {
            CaseFoldPolicy::Preserve
        } else {
            CaseFoldPolicy::Lowercase
        }
    }

    /// Apply the policy to a username.
    pub fn fold(&self, name: &str) -> String {
        match self {
            CaseFoldPolicy::Preserve => name.to_string(),
            CaseFoldPolicy::Lowercase => name.to_lowercase(),
        }
    }
}

/// Target system API version, negotiated once at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let mut next = |name: &str| -> Result<u32, String> {
            match parts.next() {
                None | Some("") => Ok(0),
                Some(p) => p
                    .parse()
                    .map_err(|_| format!("invalid {name} component in version '{s}'")),
            }
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        Ok(ApiVersion::new(major, minor, patch))
    }
}
