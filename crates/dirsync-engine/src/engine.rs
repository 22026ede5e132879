//! Reconciliation engine.
//!
//! One pass per configured group: fetch both membership snapshots, compute
//! the differences, then apply adds, removals and media updates in that
//! order. Ordering matters: a newly created account must exist before its
//! media can be written, and umbrella gating for removals must see the
//! state left behind by the add phase.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use dirsync_core::config::SyncPolicy;
use dirsync_core::error::{SyncError, SyncResult};
use dirsync_core::ids::GroupId;
use dirsync_core::traits::{DirectoryClient, TargetClient};
use dirsync_core::types::{CaseFoldPolicy, GroupSpec, NewAccount};

use crate::summary::RunSummary;

const PASSWORD_LEN: usize = 32;

/// The umbrella group, resolved once per run.
///
/// Membership in it authorizes destructive action on absent accounts; the
/// member set is kept current locally as the add phase extends it.
struct UmbrellaState {
    name: String,
    id: GroupId,
    members: BTreeSet<String>,
}

/// Drives a full synchronization run over the two capability clients.
pub struct ReconciliationEngine {
    directory: Arc<dyn DirectoryClient>,
    target: Arc<dyn TargetClient>,
    policy: SyncPolicy,
    fold: CaseFoldPolicy,
}

impl ReconciliationEngine {
    /// Create a new engine over the given clients and policy.
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        target: Arc<dyn TargetClient>,
        policy: SyncPolicy,
    ) -> Self {
        let fold = policy.case_fold();
        Self {
            directory,
            target,
            policy,
            fold,
        }
    }

    /// Run the full reconciliation: bind, negotiate, reconcile every
    /// configured group in order, disconnect.
    pub async fn run(&self) -> SyncResult<RunSummary> {
        self.policy.validate()?;
        if self.policy.dry_run {
            info!("dry-run mode: computing actions without applying them");
        }

        self.directory.bind().await?;
        self.target.login().await?;
        let version = self.target.api_version().await?;
        debug!(version = %version, "target API version negotiated");

        let specs = self.configured_groups().await?;
        self.create_missing_groups(&specs).await?;
        let mut umbrella = self.resolve_umbrella().await?;

        let mut summary = RunSummary::default();
        for spec in &specs {
            self.process_group(spec, umbrella.as_mut(), &mut summary)
                .await?;
        }

        self.directory.unbind().await?;
        info!(
            processed = summary.groups_processed,
            skipped = summary.groups_skipped,
            created = summary.accounts_created,
            added = summary.accounts_added,
            removed = summary.accounts_removed,
            deleted = summary.accounts_deleted,
            media = summary.media_updates,
            "synchronization run complete"
        );
        Ok(summary)
    }

    /// The group specs for this run, with wildcards expanded when enabled.
    async fn configured_groups(&self) -> SyncResult<Vec<GroupSpec>> {
        let names = if self.policy.wildcard_search {
            self.directory
                .resolve_groups_by_wildcard(&self.policy.groups)
                .await?
        } else {
            self.policy.groups.clone()
        };
        Ok(names.iter().map(|name| GroupSpec::parse(name)).collect())
    }

    /// Create any configured group missing from the target, up front.
    async fn create_missing_groups(&self, specs: &[GroupSpec]) -> SyncResult<()> {
        let existing: BTreeSet<String> = self
            .target
            .list_groups()
            .await?
            .into_iter()
            .map(|group| group.name)
            .collect();

        for spec in specs {
            if existing.contains(&spec.name) {
                continue;
            }
            info!(group = %spec.name, "creating target group");
            if !self.policy.dry_run {
                let id = self.target.create_group(&spec.name).await?;
                info!(group = %spec.name, id = %id, "target group created");
            }
        }
        Ok(())
    }

    /// Resolve the configured umbrella group by an explicit find-one lookup.
    /// A configured umbrella group that does not exist is fatal.
    async fn resolve_umbrella(&self) -> SyncResult<Option<UmbrellaState>> {
        let Some(name) = &self.policy.umbrella_group else {
            return Ok(None);
        };

        let group = self
            .target
            .list_groups()
            .await?
            .into_iter()
            .find(|group| group.name == *name)
            .ok_or_else(|| SyncError::UmbrellaGroupNotFound {
                group: name.clone(),
            })?;

        let members = self
            .target
            .list_group_members(&group.id)
            .await?
            .into_iter()
            .map(|member| self.fold.fold(&member))
            .collect();

        Ok(Some(UmbrellaState {
            name: name.clone(),
            id: group.id,
            members,
        }))
    }

    /// Find a target group id by exact name.
    async fn find_group_id(&self, name: &str) -> SyncResult<Option<GroupId>> {
        Ok(self
            .target
            .list_groups()
            .await?
            .into_iter()
            .find(|group| group.name == name)
            .map(|group| group.id))
    }

    /// Reconcile one configured group.
    async fn process_group(
        &self,
        spec: &GroupSpec,
        mut umbrella: Option<&mut UmbrellaState>,
        summary: &mut RunSummary,
    ) -> SyncResult<()> {
        info!(group = %spec.name, "processing group");

        let Some(members) = self.directory.resolve_group_members(&spec.name).await? else {
            info!(group = %spec.name, "group not found in directory, skipping");
            summary.groups_skipped += 1;
            return Ok(());
        };

        let directory_set: BTreeMap<String, String> = members
            .into_iter()
            .map(|member| (self.fold.fold(&member.identity), member.dn))
            .collect();

        // An empty directory group only matters when a removal policy could
        // act on it; otherwise there is nothing to reconcile.
        if directory_set.is_empty()
            && !self.policy.delete_orphans
            && !self.policy.remove_absent
        {
            info!(group = %spec.name, "no directory members and no removal policy, nothing to do");
            summary.groups_skipped += 1;
            return Ok(());
        }

        let group_id = match self.find_group_id(&spec.name).await? {
            Some(id) => Some(id),
            // The creation pass was suppressed in dry-run, so a brand-new
            // group legitimately has no id yet; reconcile against an empty
            // member set so the computed actions match a real run.
            None if self.policy.dry_run => {
                debug!(group = %spec.name, "group absent in dry-run, assuming empty membership");
                None
            }
            None => {
                return Err(SyncError::GroupMissing {
                    group: spec.name.clone(),
                })
            }
        };

        let group_members: BTreeSet<String> = match &group_id {
            Some(id) => self
                .target
                .list_group_members(id)
                .await?
                .into_iter()
                .map(|member| self.fold.fold(&member))
                .collect(),
            None => BTreeSet::new(),
        };

        let missing: BTreeSet<String> = directory_set
            .keys()
            .filter(|identity| !group_members.contains(*identity))
            .cloned()
            .collect();
        let absent: BTreeSet<String> = group_members
            .iter()
            .filter(|member| !directory_set.contains_key(*member))
            .cloned()
            .collect();

        debug!(
            group = %spec.name,
            directory = directory_set.len(),
            target = group_members.len(),
            to_add = missing.len(),
            absent = absent.len(),
            "computed membership differences"
        );

        self.apply_adds(spec, group_id.as_ref(), &directory_set, &missing, summary)
            .await?;

        if let Some(umbrella) = umbrella.as_deref_mut() {
            self.apply_umbrella_adds(umbrella, &directory_set, summary)
                .await?;
        }

        self.apply_removals(
            spec,
            group_id.as_ref(),
            umbrella.as_deref(),
            &absent,
            summary,
        )
        .await?;

        self.apply_media_updates(spec, group_id.as_ref(), &directory_set, &missing, &absent, summary)
            .await?;

        summary.groups_processed += 1;
        info!(group = %spec.name, "done with group");
        Ok(())
    }

    /// Create missing accounts and add existing ones to the group.
    async fn apply_adds(
        &self,
        spec: &GroupSpec,
        group_id: Option<&GroupId>,
        directory_set: &BTreeMap<String, String>,
        missing: &BTreeSet<String>,
        summary: &mut RunSummary,
    ) -> SyncResult<()> {
        let all_accounts: BTreeSet<String> = self
            .target
            .list_accounts()
            .await?
            .into_iter()
            .map(|account| self.fold.fold(&account.username))
            .collect();

        for username in missing {
            let Some(dn) = directory_set.get(username) else {
                continue;
            };

            if !all_accounts.contains(username) {
                let password = generate_password();
                let given_name = self
                    .directory
                    .resolve_given_name(dn)
                    .await?
                    .unwrap_or_default();
                let surname = self.directory.resolve_surname(dn).await?.unwrap_or_default();

                if self.policy.show_password() {
                    info!(
                        account = %username,
                        group = %spec.name,
                        password = %password,
                        "creating account with starting password"
                    );
                } else {
                    info!(account = %username, group = %spec.name, "creating account");
                }

                if !self.policy.dry_run {
                    let group_id = group_id.ok_or_else(|| SyncError::GroupMissing {
                        group: spec.name.clone(),
                    })?;
                    let account = NewAccount {
                        username: username.clone(),
                        given_name,
                        surname,
                        password,
                        role_id: spec.role_id.clone(),
                        group_id: group_id.clone(),
                        options: self.policy.account_options(),
                    };
                    self.target.create_account(&account).await?;
                }
                summary.accounts_created += 1;
            } else {
                info!(account = %username, group = %spec.name, "adding existing account to group");
                if !self.policy.dry_run {
                    let group_id = group_id.ok_or_else(|| SyncError::GroupMissing {
                        group: spec.name.clone(),
                    })?;
                    let id = self.target.get_account_id(username).await?.ok_or_else(|| {
                        SyncError::AccountNotFound {
                            username: username.clone(),
                        }
                    })?;
                    self.target.add_to_group(group_id, &id).await?;
                }
                summary.accounts_added += 1;
            }
        }
        Ok(())
    }

    /// Ensure every directory-resolved identity is in the umbrella group.
    /// Additive only, independent of the per-group removal policy.
    async fn apply_umbrella_adds(
        &self,
        umbrella: &mut UmbrellaState,
        directory_set: &BTreeMap<String, String>,
        summary: &mut RunSummary,
    ) -> SyncResult<()> {
        for username in directory_set.keys() {
            if umbrella.members.contains(username) {
                continue;
            }
            info!(account = %username, umbrella = %umbrella.name, "adding account to umbrella group");
            if !self.policy.dry_run {
                match self.target.get_account_id(username).await? {
                    Some(id) => self.target.add_to_group(&umbrella.id, &id).await?,
                    None => {
                        warn!(account = %username, "account not found while adding to umbrella group");
                        continue;
                    }
                }
            }
            umbrella.members.insert(username.clone());
            summary.umbrella_additions += 1;
        }
        Ok(())
    }

    /// Handle accounts present in the target group but gone from the
    /// directory. Umbrella membership gates all destructive action; without
    /// it (or without an umbrella group at all) absent accounts are only
    /// logged.
    async fn apply_removals(
        &self,
        spec: &GroupSpec,
        group_id: Option<&GroupId>,
        umbrella: Option<&UmbrellaState>,
        absent: &BTreeSet<String>,
        summary: &mut RunSummary,
    ) -> SyncResult<()> {
        for username in absent {
            let gated = umbrella.is_some_and(|u| u.members.contains(username));
            if !gated {
                debug!(account = %username, group = %spec.name, "absent account outside umbrella group, leaving untouched");
                continue;
            }

            if self.policy.delete_orphans {
                info!(account = %username, group = %spec.name, "deleting orphaned account");
                if !self.policy.dry_run {
                    // Best effort: a failed deletion must not abort the rest
                    // of the run.
                    if let Err(e) = self.delete_by_name(username).await {
                        error!(account = %username, error = %e, "failed to delete account");
                        continue;
                    }
                }
                summary.accounts_deleted += 1;
            } else if self.policy.remove_absent {
                info!(account = %username, group = %spec.name, "removing account from group");
                if !self.policy.dry_run {
                    let group_id = group_id.ok_or_else(|| SyncError::GroupMissing {
                        group: spec.name.clone(),
                    })?;
                    match self.target.get_account_id(username).await? {
                        Some(id) => self.target.remove_from_group(group_id, &id).await?,
                        None => {
                            warn!(account = %username, "account not found while removing from group");
                            continue;
                        }
                    }
                }
                summary.accounts_removed += 1;
            } else {
                info!(account = %username, group = %spec.name, "account absent from directory group, no removal policy configured");
            }
        }
        Ok(())
    }

    /// Create or refresh contact media for the group's members.
    async fn apply_media_updates(
        &self,
        spec: &GroupSpec,
        group_id: Option<&GroupId>,
        directory_set: &BTreeMap<String, String>,
        missing: &BTreeSet<String>,
        absent: &BTreeSet<String>,
        summary: &mut RunSummary,
    ) -> SyncResult<()> {
        let Some(attribute) = &self.policy.media.attribute else {
            info!(group = %spec.name, "no media attribute configured, skipping media updates");
            return Ok(());
        };

        let options = match self.policy.media.wire_options() {
            Ok(options) => options,
            Err(e) => {
                error!(group = %spec.name, error = %e, "invalid media options, skipping media updates for group");
                return Ok(());
            }
        };

        let targets: BTreeSet<String> = if self.policy.media.only_create() {
            info!(group = %spec.name, "updating media only on newly added accounts");
            missing.clone()
        } else {
            info!(group = %spec.name, "updating media on all group members");
            let mut targets: BTreeSet<String> = match group_id {
                Some(id) => self
                    .target
                    .list_group_members(id)
                    .await?
                    .into_iter()
                    .map(|member| self.fold.fold(&member))
                    .collect(),
                None => BTreeSet::new(),
            };
            // In dry-run the add phase was suppressed, so the fetched
            // membership does not yet include accounts this pass adds.
            targets.extend(missing.iter().cloned());
            targets
        };
        if targets.is_empty() {
            return Ok(());
        }

        let media_type = match self
            .target
            .resolve_media_type_id(&self.policy.media.description)
            .await
        {
            Ok(id) => id,
            Err(
                e @ (SyncError::MediaTypeNotFound { .. } | SyncError::AmbiguousMediaType { .. }),
            ) => {
                error!(group = %spec.name, error = %e, "cannot resolve media type, skipping media updates for group");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for username in &targets {
            if absent.contains(username) {
                continue;
            }
            let Some(dn) = directory_set.get(username) else {
                continue;
            };
            let Some(sendto) = self.directory.resolve_media(dn, attribute).await? else {
                debug!(account = %username, attribute = %attribute, "no media address in directory");
                continue;
            };

            info!(
                account = %username,
                media = %self.policy.media.description,
                "updating account media"
            );
            if !self.policy.dry_run {
                match self.target.get_account_id(username).await? {
                    Some(id) => {
                        self.target
                            .upsert_media(&id, &media_type, &sendto, &options)
                            .await?;
                    }
                    None => {
                        warn!(account = %username, "account not found while updating media");
                        continue;
                    }
                }
            }
            summary.media_updates += 1;
        }
        Ok(())
    }

    /// Resolve an account by name and delete it.
    async fn delete_by_name(&self, username: &str) -> SyncResult<()> {
        let id = self.target.get_account_id(username).await?.ok_or_else(|| {
            SyncError::AccountNotFound {
                username: username.to_string(),
            }
        })?;
        self.target.delete_account(&id).await
    }
}

/// A 32-character random alphanumeric starting password.
fn generate_password() -> String {
    use rand::distributions::Alphanumeric;
    use rand::rngs::OsRng;
    use rand::Rng;

    (0..PASSWORD_LEN)
        .map(|_| OsRng.sample(Alphanumeric) as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_password_shape() {
        let password = generate_password();
        assert_eq!(password.len(), PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_password());
    }
}
