//! LDAP directory client
//!
//! Implements the `DirectoryClient` capability over ldap3.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use dirsync_core::error::{SyncError, SyncResult};
use dirsync_core::traits::DirectoryClient;
use dirsync_core::types::DirectoryMember;

use crate::config::{DirectoryKind, FilterSet, GroupStyle, LdapConfig};
use crate::filter::{fill, fill_pattern};

// noSuchObject: a base-scope lookup of a DN that is gone.
const RC_NO_SUCH_OBJECT: u32 = 32;
// invalidCredentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Directory client over LDAP/Active Directory.
pub struct LdapDirectory {
    config: LdapConfig,
    filters: FilterSet,

    /// The bound connection handle, set by `bind`.
    connection: Arc<RwLock<Option<Ldap>>>,
}

impl LdapDirectory {
    /// Create a new directory client with the given configuration.
    pub fn new(config: LdapConfig) -> SyncResult<Self> {
        config.validate()?;
        let filters = config.filters();
        Ok(Self {
            config,
            filters,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// Get a handle to the bound connection.
    async fn handle(&self) -> SyncResult<Ldap> {
        let guard = self.connection.read().await;
        guard.clone().ok_or(SyncError::NotConnected {
            system: "directory".to_string(),
        })
    }

    /// Run a search and construct its entries.
    ///
    /// `noSuchObject` maps to an empty result: callers treat a vanished base
    /// DN the same as an entry without the requested attribute. Referrals
    /// are reported by the server out of band and never become entries.
    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: &[&str],
    ) -> SyncResult<Vec<SearchEntry>> {
        let mut ldap = self.handle().await?;
        debug!(base = %base, filter = %filter, "searching directory");

        let SearchResult(entries, result) = ldap
            .search(base, scope, filter, attrs)
            .await
            .map_err(|e| SyncError::connection_failed_with_source("LDAP search failed", e))?;

        if result.rc == RC_NO_SUCH_OBJECT {
            return Ok(Vec::new());
        }
        if result.rc != 0 {
            return Err(SyncError::api_failure(
                "ldap.search",
                format!("result code {}: {}", result.rc, result.text),
            ));
        }
        if !result.refs.is_empty() {
            debug!(count = result.refs.len(), "dropping referral continuations");
        }

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .filter(|entry| !entry.dn.is_empty())
            .collect())
    }

    /// Fetch a single attribute of an entry by DN.
    async fn resolve_attribute(&self, dn: &str, attribute: &str) -> SyncResult<Option<String>> {
        let entries = self
            .search(dn, Scope::Base, "(objectClass=*)", &[attribute])
            .await?;
        Ok(entries
            .into_iter()
            .next()
            .and_then(|entry| attr_values(&entry, attribute).into_iter().next()))
    }

    /// Resolve members of an Active Directory group entry.
    async fn ad_members(&self, groups: Vec<SearchEntry>) -> SyncResult<Vec<DirectoryMember>> {
        let uid = self.filters.uid_attribute.clone();
        let mut members = Vec::new();

        for group in groups {
            if self.config.recursive {
                // One closure query per group entry. The disabled-account
                // filter only applies in recursive mode.
                let mut filter = format!(
                    "(&{}{}",
                    self.filters.user,
                    fill(&self.filters.member_of, &group.dn)
                );
                if self.config.skip_disabled {
                    filter.push_str(&self.filters.disabled);
                }
                filter.push(')');

                let found = self
                    .search(&self.config.base_dn, Scope::Subtree, &filter, &[&uid])
                    .await?;
                collect_members(&mut members, found, &uid);
            } else {
                // Flat mode: the member attribute holds one DN per member.
                let filter = format!("(&{})", self.filters.user);
                for member_dn in attr_values(&group, &self.filters.member_attribute) {
                    let found = self
                        .search(&member_dn, Scope::Base, &filter, &[&uid])
                        .await?;
                    collect_members(&mut members, found, &uid);
                }
            }
        }
        Ok(members)
    }

    /// Resolve members of an OpenLDAP group entry.
    async fn openldap_members(&self, groups: Vec<SearchEntry>) -> SyncResult<Vec<DirectoryMember>> {
        let uid = self.filters.uid_attribute.clone();
        let mut members = Vec::new();

        let Some(group) = groups.into_iter().next_back() else {
            return Ok(members);
        };

        for value in attr_values(&group, &self.filters.member_attribute) {
            let found = match self.config.group_style {
                // Member values are DNs.
                GroupStyle::GroupOfNames => {
                    self.search(&value, Scope::Base, "(objectClass=*)", &[&uid])
                        .await?
                }
                // Member values are uids, resolved with a user search.
                GroupStyle::PosixGroup => {
                    let filter = fill(&self.filters.user, &value);
                    self.search(&self.config.base_dn, Scope::Subtree, &filter, &[&uid])
                        .await?
                }
            };
            collect_members(&mut members, found, &uid);
        }
        Ok(members)
    }
}

/// All values of a named attribute. Attribute names compare
/// case-insensitively, as LDAP does.
fn attr_values(entry: &SearchEntry, name: &str) -> Vec<String> {
    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.clone())
        .unwrap_or_default()
}

fn collect_members(members: &mut Vec<DirectoryMember>, entries: Vec<SearchEntry>, uid: &str) {
    for entry in entries {
        match attr_values(&entry, uid).into_iter().next() {
            Some(identity) => members.push(DirectoryMember {
                identity,
                dn: entry.dn,
            }),
            None => debug!(dn = %entry.dn, attribute = %uid, "entry has no identity attribute, skipping"),
        }
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    async fn bind(&self) -> SyncResult<()> {
        let settings = LdapConnSettings::new().set_no_tls_verify(self.config.ignore_tls_errors);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.uri)
            .await
            .map_err(|e| {
                SyncError::connection_failed_with_source(
                    format!("cannot connect to LDAP server at {}", self.config.uri),
                    e,
                )
            })?;

        // Drive the connection until it closes.
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let password = self.config.bind_password.as_deref().unwrap_or("");
        debug!(bind_dn = %self.config.bind_dn, "performing LDAP bind");

        let result = ldap
            .simple_bind(&self.config.bind_dn, password)
            .await
            .map_err(|e| {
                SyncError::connection_failed_with_source(
                    format!("LDAP bind failed for {}", self.config.bind_dn),
                    e,
                )
            })?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(SyncError::AuthenticationFailed {
                system: "directory".to_string(),
            });
        }
        if result.rc != 0 {
            return Err(SyncError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(uri = %self.config.uri, "directory connection established");
        *self.connection.write().await = Some(ldap);
        Ok(())
    }

    async fn unbind(&self) -> SyncResult<()> {
        if let Some(mut ldap) = self.connection.write().await.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "error during LDAP unbind");
            }
        }
        Ok(())
    }

    async fn resolve_group_members(
        &self,
        group: &str,
    ) -> SyncResult<Option<Vec<DirectoryMember>>> {
        let filter = fill(&self.filters.group, group);
        let entries = self
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                &filter,
                &[&self.filters.member_attribute],
            )
            .await?;

        if entries.is_empty() {
            info!(group = %group, filter = %filter, "group not found in directory");
            return Ok(None);
        }

        let members = match self.config.kind {
            DirectoryKind::ActiveDirectory => self.ad_members(entries).await?,
            DirectoryKind::OpenLdap => self.openldap_members(entries).await?,
        };
        Ok(Some(members))
    }

    async fn resolve_given_name(&self, dn: &str) -> SyncResult<Option<String>> {
        self.resolve_attribute(dn, "givenName").await
    }

    async fn resolve_surname(&self, dn: &str) -> SyncResult<Option<String>> {
        self.resolve_attribute(dn, "sn").await
    }

    async fn resolve_media(&self, dn: &str, attribute: &str) -> SyncResult<Option<String>> {
        self.resolve_attribute(dn, attribute).await
    }

    async fn resolve_groups_by_wildcard(&self, patterns: &[String]) -> SyncResult<Vec<String>> {
        let mut filters = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            info!(pattern = %pattern, "expanding group wildcard");
            filters.push(fill_pattern(&self.filters.group, pattern));
        }
        let filter = format!("(|{})", filters.join(""));

        let entries = self
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                &filter,
                &["name", "cn"],
            )
            .await?;

        let mut groups = Vec::new();
        for entry in entries {
            let name = attr_values(&entry, "name")
                .into_iter()
                .next()
                .or_else(|| attr_values(&entry, "cn").into_iter().next());
            match name {
                Some(name) => {
                    info!(group = %name, "found group");
                    groups.push(name);
                }
                None => debug!(dn = %entry.dn, "group entry without a name attribute, skipping"),
            }
        }

        if groups.is_empty() {
            info!(?patterns, "no groups matched the configured wildcards");
        }
        Ok(groups)
    }
}
