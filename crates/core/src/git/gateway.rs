//! The version-control primitives the anticipate engines depend on.

use std::collections::BTreeSet;
use std::path::Path;

use crate::errors::GitError;

/// Result of a non-committing, non-fast-forward merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The merge completed without conflicts (changes may or may not be staged).
    Clean,
    /// The merge left unmerged entries in the index.
    Conflict,
    /// The merge failed for another reason; carries git's diagnostic text.
    Error(String),
}

/// Synchronous access to one repository's working tree, index and history.
///
/// Path sets are relative to the working tree root.
pub trait Gateway {
    /// Root of the working tree.
    fn workdir(&self) -> &Path;

    /// Short name of the checked-out branch (`HEAD` when detached).
    fn current_branch(&self) -> Result<String, GitError>;

    /// Resolve a ref to a commit id. Fails with [`GitError::RefNotFound`].
    fn current_revision(&self, rev: &str) -> Result<String, GitError>;

    fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError>;

    /// Merge `branch` into the working tree without committing.
    fn attempt_merge(&self, branch: &str) -> Result<MergeOutcome, GitError>;

    /// Paths currently flagged as conflicted in the index.
    fn unmerged_paths(&self) -> Result<BTreeSet<String>, GitError>;

    /// Stage every modification and deletion of tracked files.
    fn stage_tracked(&self) -> Result<(), GitError>;

    /// Paths whose index entry differs from `HEAD`.
    fn changed_paths(&self) -> Result<BTreeSet<String>, GitError>;

    /// The subset of [`Gateway::changed_paths`] removed from the index.
    fn deleted_paths(&self) -> Result<BTreeSet<String>, GitError>;

    /// Write the current index as a tree object and return its id.
    fn write_index_tree(&self) -> Result<String, GitError>;

    /// Discard an in-progress merge. A no-op when no merge is active.
    fn abort_merge(&self);

    /// Force the index and working tree to match `rev`.
    fn hard_reset(&self, rev: &str) -> Result<(), GitError>;

    fn stage_path(&self, path: &str) -> Result<(), GitError>;

    /// Remove `path` from the index; already-absent paths are not an error.
    fn unstage_path_as_deleted(&self, path: &str) -> Result<(), GitError>;

    /// Commit the index and return the new commit id.
    fn commit(&self, message: &str, skip_hooks: bool) -> Result<String, GitError>;

    /// True if there are staged, unstaged or untracked changes.
    fn has_uncommitted_changes(&self) -> Result<bool, GitError>;
}
