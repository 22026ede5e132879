//! Version-negotiated API behavior.
//!
//! The Zabbix API renamed attributes and changed its membership and media
//! primitives over the years. All of those differences are resolved here,
//! once, from the version reported at login; the client code dispatches on
//! this table and never compares versions inline.

use dirsync_core::types::ApiVersion;

/// Behavior table for a negotiated API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiCapabilities {
    /// Account-name attribute in `user` objects: `alias` before 5.4,
    /// `username` from 5.4 on.
    pub username_field: &'static str,

    /// Login parameter name: `user` before 6.0, `username` from 6.0 on.
    pub login_field: &'static str,

    /// Role reference at account creation: `type` before 5.2, `roleid`
    /// from 5.2 on.
    pub role_field: &'static str,

    /// Whether membership changes go through the full-replace
    /// `usergroup.update` (3.4+). Older servers only have the additive
    /// `usergroup.massadd` primitive.
    pub replace_membership: bool,

    /// Whether media upserts go through `user.update` with `user_medias`
    /// (3.4+). Older servers need a delete plus legacy `user.updatemedia`.
    pub media_via_user_update: bool,
}

impl ApiCapabilities {
    /// Resolve the capability table for a version.
    pub fn for_version(version: ApiVersion) -> Self {
        Self {
            username_field: if version >= ApiVersion::new(5, 4, 0) {
                "username"
            } else {
                "alias"
            },
            login_field: if version >= ApiVersion::new(6, 0, 0) {
                "username"
            } else {
                "user"
            },
            role_field: if version >= ApiVersion::new(5, 2, 0) {
                "roleid"
            } else {
                "type"
            },
            replace_membership: version >= ApiVersion::new(3, 4, 0),
            media_via_user_update: version >= ApiVersion::new(3, 4, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_server() {
        let caps = ApiCapabilities::for_version(ApiVersion::new(3, 2, 11));
        assert_eq!(caps.username_field, "alias");
        assert_eq!(caps.login_field, "user");
        assert_eq!(caps.role_field, "type");
        assert!(!caps.replace_membership);
        assert!(!caps.media_via_user_update);
    }

    #[test]
    fn test_membership_boundary_at_3_4() {
        assert!(ApiCapabilities::for_version(ApiVersion::new(3, 4, 0)).replace_membership);
        assert!(!ApiCapabilities::for_version(ApiVersion::new(3, 2, 9)).replace_membership);
    }

    #[test]
    fn test_role_boundary_at_5_2() {
        assert_eq!(
            ApiCapabilities::for_version(ApiVersion::new(5, 2, 0)).role_field,
            "roleid"
        );
        assert_eq!(
            ApiCapabilities::for_version(ApiVersion::new(5, 0, 8)).role_field,
            "type"
        );
    }

    #[test]
    fn test_username_boundary_at_5_4() {
        assert_eq!(
            ApiCapabilities::for_version(ApiVersion::new(5, 4, 1)).username_field,
            "username"
        );
        assert_eq!(
            ApiCapabilities::for_version(ApiVersion::new(5, 2, 0)).username_field,
            "alias"
        );
    }

    #[test]
    fn test_modern_server() {
        let caps = ApiCapabilities::for_version(ApiVersion::new(6, 4, 0));
        assert_eq!(caps.username_field, "username");
        assert_eq!(caps.login_field, "username");
        assert_eq!(caps.role_field, "roleid");
        assert!(caps.replace_membership);
        assert!(caps.media_via_user_update);
    }
}
