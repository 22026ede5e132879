//! dirsync ID types
//!
//! Newtype wrappers over the target system's opaque string identifiers.
//! Ids are assigned by the target at creation time and never interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! target_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw id returned by the target system.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

target_id! {
    /// Identifier of an account in the target system.
    AccountId
}

target_id! {
    /// Identifier of a user group in the target system.
    GroupId
}

target_id! {
    /// Identifier of a media type (notification channel) in the target system.
    MediaTypeId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = AccountId::new("42");
        assert_eq!(id.as_str(), "42");
        assert_eq!(id.to_string(), "42");
        assert_eq!(AccountId::from("42"), id);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = GroupId::new("7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");
        let back: GroupId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Compile-time property: AccountId and GroupId do not mix.
        let account = AccountId::new("7");
        let group = GroupId::new("7");
        assert_eq!(account.as_str(), group.as_str());
    }
}
