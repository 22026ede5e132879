//! Run statistics.

use serde::{Deserialize, Serialize};

/// Counters for one reconciliation run.
///
/// In dry-run mode the counters reflect the actions that would have been
/// taken; the mutating calls themselves are suppressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Groups that went through a full reconciliation pass.
    pub groups_processed: u64,
    /// Groups skipped (not found in the directory, or nothing to do).
    pub groups_skipped: u64,
    /// Accounts created.
    pub accounts_created: u64,
    /// Existing accounts added to their group.
    pub accounts_added: u64,
    /// Accounts added to the umbrella group.
    pub umbrella_additions: u64,
    /// Accounts removed from a group (but kept).
    pub accounts_removed: u64,
    /// Orphaned accounts deleted.
    pub accounts_deleted: u64,
    /// Contact-media entries created or replaced.
    pub media_updates: u64,
}

impl RunSummary {
    /// Whether the run computed any action at all.
    pub fn has_changes(&self) -> bool {
        self.accounts_created
            + self.accounts_added
            + self.umbrella_additions
            + self.accounts_removed
            + self.accounts_deleted
            + self.media_updates
            > 0
    }
}
