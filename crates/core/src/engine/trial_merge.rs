//! Starting and aborting a session.

use tracing::{info, warn};

use super::Anticipator;
use crate::errors::{AnticipateError, GitError, SessionError};
use crate::git::{Gateway, MergeOutcome};
use crate::models::{short_sha, StartOutcome};
use crate::session::{Session, SessionHandle};

impl<G: Gateway> Anticipator<G> {
    /// Trial-merge `target_branch` into the working tree.
    ///
    /// The session is persisted before the merge runs, so a crash during the
    /// merge still leaves a record that `status` and `abort` can act on.
    pub fn start(&self, target_branch: &str) -> Result<StartOutcome, AnticipateError> {
        if self.store.exists() {
            return Err(AnticipateError::SessionAlreadyActive);
        }
        if self.git.has_uncommitted_changes()? {
            return Err(AnticipateError::DirtyWorkingTree);
        }

        let target_revision = self
            .git
            .current_revision(target_branch)
            .map_err(|e| match e {
                GitError::RefNotFound(_) => AnticipateError::UnknownRef(target_branch.to_string()),
                other => other.into(),
            })?;
        let current_branch = self.git.current_branch()?;
        let original_head = self.git.current_revision("HEAD")?;

        let merge_base = match self.git.merge_base(&original_head, &target_revision) {
            Ok(base) => Some(base),
            Err(e) => {
                warn!(error = %e, "no merge base with target branch");
                None
            }
        };

        info!(
            target = target_branch,
            current = %current_branch,
            head = %short_sha(&original_head),
            "starting anticipate session"
        );

        let session = Session::new(target_branch, target_revision, original_head, current_branch);
        self.store.save(&session).map_err(|e| match e {
            SessionError::AlreadyActive => AnticipateError::SessionAlreadyActive,
            other => other.into(),
        })?;

        let outcome = match self.git.attempt_merge(target_branch) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.store.clear();
                return Err(e.into());
            }
        };

        match outcome {
            MergeOutcome::Conflict => {
                let conflicts: Vec<String> = self.git.unmerged_paths()?.into_iter().collect();
                info!(count = conflicts.len(), "conflicts pending");
                Ok(StartOutcome::ConflictsPending {
                    session: SessionHandle::new(session),
                    merge_base,
                    conflicts,
                })
            }
            MergeOutcome::Error(detail) => {
                self.store.clear();
                Err(AnticipateError::MergeFailed(detail))
            }
            MergeOutcome::Clean => {
                if self.git.has_uncommitted_changes()? {
                    info!("clean merge with staged changes");
                    Ok(StartOutcome::ReadyToCommit {
                        session: SessionHandle::new(session),
                        merge_base,
                    })
                } else {
                    info!("branches are already compatible");
                    self.git.abort_merge();
                    self.store.clear();
                    Ok(StartOutcome::NoChanges { merge_base })
                }
            }
        }
    }

    /// Discard the trial merge and restore the original head.
    pub fn abort(&self, handle: SessionHandle) -> Result<(), AnticipateError> {
        let session = handle.into_session();
        self.git.abort_merge();
        self.git.hard_reset(&session.original_head)?;
        self.store.clear();
        info!(head = %short_sha(&session.original_head), "aborted anticipate session");
        Ok(())
    }
}
