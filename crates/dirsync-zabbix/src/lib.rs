//! # dirsync Zabbix client
//!
//! Target-side client for dirsync, implementing the
//! [`TargetClient`](dirsync_core::TargetClient) capability over the Zabbix
//! JSON-RPC API.
//!
//! Version-dependent API quirks (the `alias`/`username` rename, the
//! membership-update primitive, role vs. user type, the media-update call)
//! are resolved once at login into an [`ApiCapabilities`] table; the rest of
//! the client never compares versions.
//!
//! ## Example
//!
//! ```ignore
//! use dirsync_core::TargetClient;
//! use dirsync_zabbix::{ZabbixClient, ZabbixConfig};
//!
//! let config = ZabbixConfig::new("https://zabbix.example.com", "sync", "secret");
//! let client = ZabbixClient::new(config)?;
//! client.login().await?;
//! ```

pub mod capabilities;
pub mod client;
pub mod config;

// Re-exports
pub use capabilities::ApiCapabilities;
pub use client::ZabbixClient;
pub use config::{AuthMethod, ZabbixConfig};
