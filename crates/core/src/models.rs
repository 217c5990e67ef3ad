//! Outcome and report types returned by the anticipate engines.

use std::fmt;

use serde::Serialize;

use crate::session::{Session, SessionHandle};

/// Shorten a commit id to 8 characters for display.
///
/// An empty (or whitespace-only) id renders as `unknown`.
pub fn short_sha(sha: &str) -> String {
    let sha = sha.trim();
    if sha.is_empty() {
        return "unknown".into();
    }
    sha.chars().take(8).collect()
}

/// Result of a successful `start`.
#[derive(Debug)]
pub enum StartOutcome {
    /// The branches are already content-identical; no session was kept.
    NoChanges { merge_base: Option<String> },
    /// The merge left conflicted paths for the user to resolve.
    ConflictsPending {
        session: SessionHandle,
        merge_base: Option<String>,
        conflicts: Vec<String>,
    },
    /// The merge was clean and staged changes await `continue`.
    ReadyToCommit {
        session: SessionHandle,
        merge_base: Option<String>,
    },
}

impl StartOutcome {
    pub fn merge_base(&self) -> Option<&str> {
        match self {
            Self::NoChanges { merge_base }
            | Self::ConflictsPending { merge_base, .. }
            | Self::ReadyToCommit { merge_base, .. } => merge_base.as_deref(),
        }
    }

    /// The live session, unless the start was a no-op.
    pub fn session(&self) -> Option<&SessionHandle> {
        match self {
            Self::NoChanges { .. } => None,
            Self::ConflictsPending { session, .. } | Self::ReadyToCommit { session, .. } => {
                Some(session)
            }
        }
    }
}

/// Result of a successful `continue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinueOutcome {
    /// The resolution reduced to the original tree; nothing was committed.
    NoChanges,
    /// The resolution was replayed as a single commit.
    Committed {
        sha: String,
        branch: String,
        target_branch: String,
        written: usize,
        deleted: usize,
    },
}

/// Where an active session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    ConflictPending,
    ReadyToCommit,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConflictPending => write!(f, "conflict_pending"),
            Self::ReadyToCommit => write!(f, "ready_to_commit"),
        }
    }
}

/// Read-only snapshot of the session state and live conflicts.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusReport {
    Idle,
    Active {
        session: Session,
        phase: SessionPhase,
        unmerged: Vec<String>,
    },
}
