//! Engine-facing configuration types.
//!
//! Transport settings live with their client crates; this module holds the
//! reconciliation policy the engine itself consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{SyncError, SyncResult};
use crate::severity;
use crate::types::CaseFoldPolicy;

/// Contact-media synchronization policy.
///
/// `onlycreate` and `severity` options are interpreted locally; the
/// remaining key/value pairs pass through to the target system verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPolicy {
    /// Directory attribute holding the media address (e.g. `mail`).
    /// When unset, media synchronization is skipped entirely.
    #[serde(default)]
    pub attribute: Option<String>,

    /// Media type description in the target system.
    #[serde(default = "default_media_description")]
    pub description: String,

    /// Media options applied on top of the target defaults.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

fn default_media_description() -> String {
    "Email (HTML)".to_string()
}

impl Default for MediaPolicy {
    fn default() -> Self {
        Self {
            attribute: None,
            description: default_media_description(),
            options: BTreeMap::new(),
        }
    }
}

impl MediaPolicy {
    /// Whether media is only applied to accounts created in this pass.
    pub fn only_create(&self) -> bool {
        self.options
            .get("onlycreate")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// The options to send over the wire: local keys stripped, severity
    /// converted to its bitmask form.
    ///
    /// Fails with [`SyncError::InvalidSeverity`] when the configured
    /// severity names a level outside the fixed set.
    pub fn wire_options(&self) -> SyncResult<Vec<(String, String)>> {
        let mut filtered = Vec::with_capacity(self.options.len());
        for (key, value) in &self.options {
            match key.as_str() {
                "description" | "name" | "onlycreate" => continue,
                "severity" => filtered.push((key.clone(), severity::encode(value)?)),
                _ => filtered.push((key.clone(), value.clone())),
            }
        }
        Ok(filtered)
    }
}

/// The reconciliation policy for a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Group specification strings (`"<name>"` or `"<name>:<roleid>"`), or
    /// wildcard patterns when `wildcard_search` is set.
    pub groups: Vec<String>,

    /// Optional catch-all target group. Membership in it authorizes
    /// destructive action on absent accounts.
    #[serde(default)]
    pub umbrella_group: Option<String>,

    /// Keep account ids verbatim instead of folding to lowercase.
    #[serde(default)]
    pub preserve_account_ids: bool,

    /// Delete accounts that left their directory group (umbrella-gated).
    #[serde(default)]
    pub delete_orphans: bool,

    /// Remove absent accounts from the group without deleting them.
    #[serde(default)]
    pub remove_absent: bool,

    /// Expand the configured group names as wildcard patterns.
    #[serde(default)]
    pub wildcard_search: bool,

    /// Compute and log every action but suppress all mutating calls.
    #[serde(default)]
    pub dry_run: bool,

    /// Contact-media policy.
    #[serde(default)]
    pub media: MediaPolicy,

    /// Pass-through account options applied at creation time.
    /// The `show_password` flag is interpreted locally and never sent.
    #[serde(default)]
    pub user_options: BTreeMap<String, String>,
}

impl SyncPolicy {
    /// The run-wide case-folding policy.
    pub fn case_fold(&self) -> CaseFoldPolicy {
        CaseFoldPolicy::from_preserve_flag(self.preserve_account_ids)
    }

    /// Whether created-account log lines include the starting password.
    pub fn show_password(&self) -> bool {
        self.user_options
            .get("show_password")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Account options forwarded to the target at creation time.
    pub fn account_options(&self) -> Vec<(String, String)> {
        self.user_options
            .iter()
            .filter(|(key, _)| key.as_str() != "show_password")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Validate the policy before a run.
    pub fn validate(&self) -> SyncResult<()> {
        if self.groups.is_empty() {
            return Err(SyncError::invalid_configuration(
                "no groups configured to synchronize",
            ));
        }
        if self.delete_orphans && self.remove_absent {
            return Err(SyncError::invalid_configuration(
                "delete_orphans and remove_absent are mutually exclusive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SyncPolicy {
        SyncPolicy {
            groups: vec!["ops".to_string()],
            umbrella_group: None,
            preserve_account_ids: false,
            delete_orphans: false,
            remove_absent: false,
            wildcard_search: false,
            dry_run: false,
            media: MediaPolicy::default(),
            user_options: BTreeMap::new(),
        }
    }

    #[test]
    fn test_media_policy_wire_options() {
        let mut media = MediaPolicy::default();
        media.options.insert("severity".to_string(), "Disaster".to_string());
        media.options.insert("onlycreate".to_string(), "true".to_string());
        media.options.insert("period".to_string(), "1-5,09:00-18:00".to_string());
        media.options.insert("description".to_string(), "ignored".to_string());

        assert!(media.only_create());
        let wire = media.wire_options().unwrap();
        assert_eq!(
            wire,
            vec![
                ("period".to_string(), "1-5,09:00-18:00".to_string()),
                ("severity".to_string(), "32".to_string()),
            ]
        );
    }

    #[test]
    fn test_media_policy_invalid_severity() {
        let mut media = MediaPolicy::default();
        media.options.insert("severity".to_string(), "Bogus".to_string());
        assert!(matches!(
            media.wire_options(),
            Err(SyncError::InvalidSeverity { .. })
        ));
    }

    #[test]
    fn test_policy_validation() {
        assert!(policy().validate().is_ok());

        let mut empty = policy();
        empty.groups.clear();
        assert!(empty.validate().is_err());

        let mut both = policy();
        both.delete_orphans = true;
        both.remove_absent = true;
        assert!(both.validate().is_err());
    }

    #[test]
    fn test_account_options_strip_show_password() {
        let mut p = policy();
        p.user_options
            .insert("show_password".to_string(), "true".to_string());
        p.user_options
            .insert("autologout".to_string(), "600".to_string());

        assert!(p.show_password());
        assert_eq!(
            p.account_options(),
            vec![("autologout".to_string(), "600".to_string())]
        );
    }
}
