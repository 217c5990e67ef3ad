//! In-memory [`Gateway`] for engine unit tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use super::gateway::{Gateway, MergeOutcome};
use crate::errors::GitError;

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub refs: HashMap<String, String>,
    pub branch: String,
    pub dirty: bool,
    pub merge_outcome: Option<MergeOutcome>,
    pub changes_after_merge: bool,
    pub unmerged: BTreeSet<String>,
    pub changed: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub reject_commit: bool,
    pub fail_reset: bool,
    pub calls: Vec<String>,
}

/// Scripted gateway that records every mutating call.
pub(crate) struct FakeGateway {
    workdir: PathBuf,
    pub state: RefCell<FakeState>,
}

impl FakeGateway {
    pub fn new(workdir: &Path) -> Self {
        let mut state = FakeState {
            branch: "feature".into(),
            ..FakeState::default()
        };
        state.refs.insert("HEAD".into(), "a".repeat(40));
        state.refs.insert("feature".into(), "a".repeat(40));
        state.refs.insert("main".into(), "b".repeat(40));
        state.merge_outcome = Some(MergeOutcome::Clean);
        Self {
            workdir: workdir.to_path_buf(),
            state: RefCell::new(state),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.state.borrow_mut().calls.push(call.into());
    }
}

impl Gateway for FakeGateway {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn current_branch(&self) -> Result<String, GitError> {
        Ok(self.state.borrow().branch.clone())
    }

    fn current_revision(&self, rev: &str) -> Result<String, GitError> {
        self.state
            .borrow()
            .refs
            .get(rev)
            .cloned()
            .ok_or_else(|| GitError::RefNotFound(rev.to_string()))
    }

    fn merge_base(&self, _a: &str, _b: &str) -> Result<String, GitError> {
        Ok("c".repeat(40))
    }

    fn attempt_merge(&self, branch: &str) -> Result<MergeOutcome, GitError> {
        self.record(format!("merge {branch}"));
        let outcome = self
            .state
            .borrow()
            .merge_outcome
            .clone()
            .unwrap_or(MergeOutcome::Clean);
        if outcome == MergeOutcome::Clean && self.state.borrow().changes_after_merge {
            self.state.borrow_mut().dirty = true;
        }
        Ok(outcome)
    }

    fn unmerged_paths(&self) -> Result<BTreeSet<String>, GitError> {
        Ok(self.state.borrow().unmerged.clone())
    }

    fn stage_tracked(&self) -> Result<(), GitError> {
        self.record("add -u");
        Ok(())
    }

    fn changed_paths(&self) -> Result<BTreeSet<String>, GitError> {
        Ok(self.state.borrow().changed.clone())
    }

    fn deleted_paths(&self) -> Result<BTreeSet<String>, GitError> {
        Ok(self.state.borrow().deleted.clone())
    }

    fn write_index_tree(&self) -> Result<String, GitError> {
        self.record("write-tree");
        Ok("d".repeat(40))
    }

    fn abort_merge(&self) {
        self.record("merge --abort");
    }

    fn hard_reset(&self, rev: &str) -> Result<(), GitError> {
        self.record(format!("reset {rev}"));
        if self.state.borrow().fail_reset {
            return Err(GitError::CommandFailed {
                args: format!("reset -q --hard {rev}"),
                exit_code: 128,
                stderr: "fatal: index.lock exists".into(),
            });
        }
        Ok(())
    }

    fn stage_path(&self, path: &str) -> Result<(), GitError> {
        self.record(format!("add {path}"));
        Ok(())
    }

    fn unstage_path_as_deleted(&self, path: &str) -> Result<(), GitError> {
        self.record(format!("rm {path}"));
        Ok(())
    }

    fn commit(&self, message: &str, skip_hooks: bool) -> Result<String, GitError> {
        self.record(format!("commit {message} skip_hooks={skip_hooks}"));
        if self.state.borrow().reject_commit && !skip_hooks {
            return Err(GitError::CommitRejected {
                detail: "pre-commit hook exited with 1".into(),
            });
        }
        Ok("e".repeat(40))
    }

    fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        Ok(self.state.borrow().dirty)
    }
}
