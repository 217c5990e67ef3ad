//! Repository access via `git2` and the `git` binary.
//!
//! Read-only queries (ref resolution, index conflicts, staged diffs, status)
//! go through `git2`. Anything that mutates merge state, runs hooks or
//! rewrites the working tree shells out to `git`, so the result is identical
//! to what the user would get by typing the command.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use git2::{Delta, Index, Oid, Repository, StatusOptions};
use tracing::{debug, info, instrument, warn};

use super::command::GitCommand;
use super::gateway::{Gateway, MergeOutcome};
use crate::errors::GitError;

/// [`Gateway`] implementation for a local, non-bare repository.
pub struct GitClient {
    repo: Repository,
    workdir: PathBuf,
    git: GitCommand,
}

impl GitClient {
    /// Open the repository containing `path`, searching parent directories.
    pub fn discover<P: AsRef<Path>>(path: P, git_binary: &str) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::discover(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::BareRepository(repo.path().display().to_string()))?
            .to_path_buf();
        info!(workdir = %workdir.display(), "opened git repository");
        let git = GitCommand::new(git_binary, &workdir);
        Ok(Self { repo, workdir, git })
    }

    /// The repository's private metadata directory (`.git`).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// The on-disk index, re-read so changes made by the `git` binary are visible.
    fn index(&self) -> Result<Index, GitError> {
        let mut index = self.repo.index()?;
        index.read(true)?;
        Ok(index)
    }

    fn resolve(&self, rev: &str) -> Result<Oid, GitError> {
        let object = self
            .repo
            .revparse_single(rev)
            .map_err(|_| GitError::RefNotFound(rev.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| GitError::RefNotFound(rev.to_string()))?;
        Ok(commit.id())
    }

    /// Every index entry that differs from `HEAD`, with its delta kind.
    fn staged_deltas(&self) -> Result<Vec<(Delta, String)>, GitError> {
        let index = self.index()?;
        let head_tree = self.repo.head()?.peel_to_tree()?;
        let diff = self
            .repo
            .diff_tree_to_index(Some(&head_tree), Some(&index), None)?;

        let mut deltas = Vec::new();
        for delta in diff.deltas() {
            let file = match delta.status() {
                Delta::Deleted => delta.old_file(),
                _ => delta.new_file(),
            };
            if let Some(path) = file.path() {
                deltas.push((delta.status(), path.to_string_lossy().to_string()));
            }
        }
        debug!(count = deltas.len(), "collected staged deltas");
        Ok(deltas)
    }
}

impl Gateway for GitClient {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn current_branch(&self) -> Result<String, GitError> {
        let head = self.repo.head()?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    fn current_revision(&self, rev: &str) -> Result<String, GitError> {
        Ok(self.resolve(rev)?.to_string())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError> {
        let base = self.repo.merge_base(self.resolve(a)?, self.resolve(b)?)?;
        Ok(base.to_string())
    }

    #[instrument(skip(self))]
    fn attempt_merge(&self, branch: &str) -> Result<MergeOutcome, GitError> {
        let output = self.git.output(&["merge", "--no-commit", "--no-ff", branch])?;
        if output.success {
            info!("trial merge completed cleanly");
            return Ok(MergeOutcome::Clean);
        }

        let unmerged = self.unmerged_paths()?;
        if !unmerged.is_empty() {
            info!(count = unmerged.len(), "trial merge stopped on conflicts");
            return Ok(MergeOutcome::Conflict);
        }

        let detail = output.combined();
        warn!(exit_code = output.exit_code, %detail, "trial merge failed");
        Ok(MergeOutcome::Error(detail))
    }

    fn unmerged_paths(&self) -> Result<BTreeSet<String>, GitError> {
        let index = self.index()?;
        let mut paths = BTreeSet::new();
        if !index.has_conflicts() {
            return Ok(paths);
        }
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
            if let Some(entry) = entry {
                paths.insert(String::from_utf8_lossy(&entry.path).to_string());
            }
        }
        Ok(paths)
    }

    fn stage_tracked(&self) -> Result<(), GitError> {
        self.git.run(&["add", "-u"])?;
        Ok(())
    }

    fn changed_paths(&self) -> Result<BTreeSet<String>, GitError> {
        Ok(self
            .staged_deltas()?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    fn deleted_paths(&self) -> Result<BTreeSet<String>, GitError> {
        Ok(self
            .staged_deltas()?
            .into_iter()
            .filter(|(status, _)| *status == Delta::Deleted)
            .map(|(_, path)| path)
            .collect())
    }

    fn write_index_tree(&self) -> Result<String, GitError> {
        let mut index = self.index()?;
        let tree = index.write_tree()?;
        debug!(tree = %tree, "wrote index tree");
        Ok(tree.to_string())
    }

    fn abort_merge(&self) {
        match self.git.output(&["merge", "--abort"]) {
            Ok(output) if output.success => debug!("aborted merge"),
            Ok(_) => debug!("no merge to abort"),
            Err(e) => warn!(error = %e, "could not run git merge --abort"),
        }
    }

    #[instrument(skip(self))]
    fn hard_reset(&self, rev: &str) -> Result<(), GitError> {
        self.git.run(&["reset", "-q", "--hard", rev])?;
        info!(rev, "reset working tree");
        Ok(())
    }

    fn stage_path(&self, path: &str) -> Result<(), GitError> {
        self.git.run(&["add", "--", path])?;
        Ok(())
    }

    fn unstage_path_as_deleted(&self, path: &str) -> Result<(), GitError> {
        self.git
            .run(&["rm", "-q", "--cached", "--ignore-unmatch", "--", path])?;
        Ok(())
    }

    #[instrument(skip(self, message))]
    fn commit(&self, message: &str, skip_hooks: bool) -> Result<String, GitError> {
        let mut args = vec!["commit", "-q", "-m", message];
        if skip_hooks {
            args.push("--no-verify");
        }
        let output = self.git.output(&args)?;
        if !output.success {
            let detail = output.combined();
            warn!(exit_code = output.exit_code, %detail, "commit failed");
            return Err(GitError::CommitRejected { detail });
        }
        let sha = self.current_revision("HEAD")?;
        info!(sha = %sha, "created commit");
        Ok(sha)
    }

    fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(!statuses.is_empty())
    }
}
