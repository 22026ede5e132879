//! # dirsync LDAP client
//!
//! Directory-side client for dirsync, implementing the
//! [`DirectoryClient`](dirsync_core::DirectoryClient) capability over
//! LDAP and Active Directory.
//!
//! ## Features
//!
//! - Flat (group-member attribute) and recursive (member-of closure,
//!   Active Directory only) membership resolution
//! - Disabled-account filtering on recursive queries
//! - Wildcard group-name expansion
//! - Configurable filter templates with LDAP value escaping
//!
//! ## Example
//!
//! ```ignore
//! use dirsync_core::DirectoryClient;
//! use dirsync_ldap::{DirectoryKind, LdapConfig, LdapDirectory};
//!
//! let config = LdapConfig::new(
//!     "ldaps://dc01.example.com:636",
//!     "dc=example,dc=com",
//!     "cn=sync,ou=service,dc=example,dc=com",
//! )
//! .with_password("secret")
//! .with_kind(DirectoryKind::ActiveDirectory);
//!
//! let directory = LdapDirectory::new(config)?;
//! directory.bind().await?;
//! ```

pub mod client;
pub mod config;
mod filter;

// Re-exports
pub use client::LdapDirectory;
pub use config::{DirectoryKind, GroupStyle, LdapConfig};
