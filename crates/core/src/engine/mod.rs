//! The anticipate workflow: start a trial merge, let the user resolve it,
//! replay the resolution as a commit, or roll everything back.
//!
//! Session-level state machine (`Idle` is both initial and terminal):
//!
//! ```text
//! Idle --start, conflicts-------> ConflictPending --continue--> Idle
//! Idle --start, clean + changes-> ReadyToCommit   --continue--> Idle
//! Idle --start, clean, no diff--> Idle
//! ConflictPending | ReadyToCommit --abort--> Idle
//! ```

mod replay;
mod status;
mod trial_merge;

use std::path::Path;

use tracing::debug;

use crate::config::{AnticipateConfig, CommitConfig};
use crate::errors::{AnticipateError, SessionError};
use crate::git::{Gateway, GitClient};
use crate::session::{Session, SessionHandle, SessionStore};

/// Drives anticipate sessions for one repository.
pub struct Anticipator<G: Gateway> {
    git: G,
    store: SessionStore,
    commit: CommitConfig,
}

impl Anticipator<GitClient> {
    /// Open the repository containing `path` using `config`.
    pub fn discover<P: AsRef<Path>>(
        path: P,
        config: &AnticipateConfig,
    ) -> Result<Self, AnticipateError> {
        let client = GitClient::discover(path, &config.git.binary)?;
        let store = SessionStore::new(client.git_dir());
        Ok(Self::new(client, store).with_commit_config(config.commit.clone()))
    }
}

impl<G: Gateway> Anticipator<G> {
    pub fn new(git: G, store: SessionStore) -> Self {
        Self {
            git,
            store,
            commit: CommitConfig::default(),
        }
    }

    pub fn with_commit_config(mut self, commit: CommitConfig) -> Self {
        self.commit = commit;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.git
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Reacquire the handle of the session persisted by an earlier `start`.
    ///
    /// A record without an original head or target branch cannot drive a
    /// reset, so it is rejected as corrupt here even though `status` shows it.
    pub fn open_session(&self) -> Result<SessionHandle, AnticipateError> {
        let session = self.load_session()?;
        if session.original_head.trim().is_empty() || session.target_branch.trim().is_empty() {
            return Err(SessionError::Corrupt {
                detail: format!(
                    "{}: missing original head or target branch",
                    self.store.record_path().display()
                ),
            }
            .into());
        }
        debug!(target = %session.target_branch, "opened session");
        Ok(SessionHandle::new(session))
    }

    fn load_session(&self) -> Result<Session, AnticipateError> {
        self.store.load().map_err(|e| match e {
            SessionError::NotFound => AnticipateError::NoSessionInProgress,
            other => other.into(),
        })
    }
}
