//! The persisted anticipate session and the handle that carries it.
//!
//! At most one session exists per repository. A record on disk means a trial
//! merge was started and has been neither committed nor aborted; the record is
//! never modified after it is written.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::SessionStore;

/// Metadata describing one in-progress anticipate workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Name of the branch being anticipated.
    pub target_branch: String,
    /// Commit the target branch pointed at when the session started.
    pub target_revision: String,
    /// Commit the current branch pointed at before the trial merge; the
    /// rollback point.
    pub original_head: String,
    /// Branch the resolution commit lands on.
    pub current_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        target_branch: impl Into<String>,
        target_revision: impl Into<String>,
        original_head: impl Into<String>,
        current_branch: impl Into<String>,
    ) -> Self {
        Self {
            target_branch: target_branch.into(),
            target_revision: target_revision.into(),
            original_head: original_head.into(),
            current_branch: current_branch.into(),
            started_at: Some(Utc::now()),
        }
    }
}

/// Proof that a session is live.
///
/// Returned by `start` and by `open_session`; `continue` and `abort` consume
/// it, so a finalized session cannot be driven again in the same process.
#[derive(Debug)]
pub struct SessionHandle {
    session: Session,
}

impl SessionHandle {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }
}
