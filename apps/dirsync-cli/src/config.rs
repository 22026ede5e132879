//! TOML configuration file for the synchronization job.

use std::path::Path;

use serde::Deserialize;

use dirsync_core::config::SyncPolicy;
use dirsync_core::error::{SyncError, SyncResult};
use dirsync_ldap::LdapConfig;
use dirsync_zabbix::ZabbixConfig;

/// Whole-job configuration, loaded from a single TOML file.
///
/// ```toml
/// [ldap]
/// uri = "ldaps://ad.example.com"
/// base_dn = "dc=example,dc=com"
/// bind_dn = "cn=sync,dc=example,dc=com"
/// bind_password = "secret"
/// kind = "activedirectory"
///
/// [zabbix]
/// server = "https://zabbix.example.com"
/// username = "Admin"
/// password = "secret"
///
/// [sync]
/// groups = ["ops", "admins:3"]
/// umbrella_group = "All directory users"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub ldap: LdapConfig,
    pub zabbix: ZabbixConfig,
    pub sync: SyncPolicy,
}

impl AppConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::invalid_configuration(format!(
                "cannot read config file '{}': {e}",
                path.display()
            ))
        })?;
        let config: AppConfig = toml::from_str(&raw).map_err(|e| {
            SyncError::invalid_configuration(format!(
                "cannot parse config file '{}': {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SyncResult<()> {
        self.ldap.validate()?;
        self.zabbix.validate()?;
        self.sync.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [ldap]
        uri = "ldap://ad.example.com"
        base_dn = "dc=example,dc=com"
        bind_dn = "cn=sync,dc=example,dc=com"
        bind_password = "secret"

        [zabbix]
        server = "https://zabbix.example.com"
        username = "Admin"
        password = "secret"

        [sync]
        groups = ["ops", "admins:3"]
    "#;

    #[test]
    fn test_minimal_config_parses() {
        let config: AppConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.sync.groups.len(), 2);
        assert!(config.sync.umbrella_group.is_none());
        assert!(!config.sync.dry_run);
        config.validate().unwrap();
    }

    #[test]
    fn test_full_config_parses() {
        let raw = format!(
            "{MINIMAL}\n\
            umbrella_group = \"All directory users\"\n\
            delete_orphans = true\n\
            [sync.media]\n\
            attribute = \"mail\"\n\
            [sync.media.options]\n\
            severity = \"High\"\n\
            onlycreate = \"true\"\n"
        );
        let config: AppConfig = toml::from_str(&raw).unwrap();
        assert_eq!(
            config.sync.umbrella_group.as_deref(),
            Some("All directory users")
        );
        assert!(config.sync.delete_orphans);
        assert_eq!(config.sync.media.attribute.as_deref(), Some("mail"));
        assert!(config.sync.media.only_create());
    }

    #[test]
    fn test_conflicting_removal_policies_rejected() {
        let raw = format!("{MINIMAL}\ndelete_orphans = true\nremove_absent = true\n");
        let config: AppConfig = toml::from_str(&raw).unwrap();
        assert!(config.validate().is_err());
    }
}
