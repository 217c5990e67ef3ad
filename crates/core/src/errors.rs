//! Error types for the anticipate core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and the
//! top-level [`AnticipateError`] enum unifies them together with the
//! workflow-level failures (precondition violations, unresolved conflicts,
//! replay failures).

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for every anticipate operation.
#[derive(Debug, Error)]
pub enum AnticipateError {
    /// `start` was called while a session record already exists.
    #[error("anticipate already in progress\nUse 'git anticipate continue' or 'git anticipate abort'")]
    SessionAlreadyActive,

    /// `continue` / `abort` was called with no session record present.
    #[error("no anticipate in progress")]
    NoSessionInProgress,

    /// The working tree has staged, unstaged or untracked changes.
    #[error("you have uncommitted changes\nPlease commit or stash them before running git anticipate")]
    DirtyWorkingTree,

    /// The target branch / ref could not be resolved.
    #[error("target branch '{0}' does not exist")]
    UnknownRef(String),

    /// `continue` found paths still flagged as conflicted in the index.
    #[error("unresolved conflicts remain in {} file(s)", .0.len())]
    UnresolvedConflicts(Vec<String>),

    /// The trial merge failed for a reason other than conflicts.
    #[error("merge failed: {0}")]
    MergeFailed(String),

    /// A resolved file could not be captured before the trial merge was discarded.
    #[error("failed to read resolved file {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the captured resolution back after the reset failed.
    #[error("{detail}\nThe resolved tree was saved as {resolution_tree}; restore it with:\n  git checkout {resolution_tree} -- .")]
    Replay {
        detail: String,
        resolution_tree: String,
    },

    /// An earlier `continue` reset the working tree but never committed, and
    /// the tree no longer shows the resolution.
    #[error("a previous replay was interrupted before committing\nThe resolved tree was saved as {resolution_tree}; restore it with:\n  git checkout {resolution_tree} -- .")]
    ReplayInterrupted { resolution_tree: String },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification of an [`AnticipateError`], used for exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// User-actionable: dirty tree, unknown branch, session (not) active.
    Precondition,
    /// Conflicts remain; the expected workflow signal, not a failure.
    ResolutionIncomplete,
    /// The merge / commit / reset primitive itself failed.
    GatewayFailure,
    /// The session record could not be read or written.
    PersistenceFailure,
}

/// Process exit code for a pending-conflict outcome.
pub const EXIT_CONFLICTS: u8 = 1;
/// Process exit code for any hard error.
pub const EXIT_ERROR: u8 = 2;

impl AnticipateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionAlreadyActive
            | Self::NoSessionInProgress
            | Self::DirtyWorkingTree
            | Self::UnknownRef(_)
            | Self::ReplayInterrupted { .. } => ErrorKind::Precondition,
            Self::UnresolvedConflicts(_) => ErrorKind::ResolutionIncomplete,
            Self::MergeFailed(_) | Self::Snapshot { .. } | Self::Replay { .. } | Self::Git(_) => {
                ErrorKind::GatewayFailure
            }
            Self::Session(SessionError::AlreadyActive) => ErrorKind::Precondition,
            Self::Session(SessionError::NotFound) => ErrorKind::Precondition,
            Self::Session(_) | Self::Config(_) => ErrorKind::PersistenceFailure,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::ResolutionIncomplete => EXIT_CONFLICTS,
            _ => EXIT_ERROR,
        }
    }

    /// Extra guidance printed after the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Git(GitError::CommitRejected { .. }) => Some(
                "If pre-commit hooks are failing, you can:\n  \
                 1. Fix the issues and run 'git anticipate continue' again\n  \
                 2. Or run 'git anticipate continue --skip-hooks' to skip hooks",
            ),
            Self::ReplayInterrupted { .. } => Some(
                "After restoring, run 'git anticipate continue' again, \
                 or 'git anticipate abort' to discard the resolution",
            ),
            Self::UnresolvedConflicts(_) => {
                Some("Resolve conflicts and run 'git add', then 'git anticipate continue'")
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from the version-control gateway.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path is not inside a git repository.
    #[error("not a git repository: '{0}'")]
    RepositoryNotFound(String),

    /// The repository has no working tree.
    #[error("repository at '{0}' is bare; a working tree is required")]
    BareRepository(String),

    /// A ref (branch, tag, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("git {args} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        args: String,
        exit_code: i32,
        stderr: String,
    },

    /// `git commit` failed, usually because a hook rejected it.
    #[error("failed to create commit: {detail}")]
    CommitRejected { detail: String },

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Session store errors
// ---------------------------------------------------------------------------

/// Errors from the on-disk session record.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A record is already persisted; the new one was not written.
    #[error("a session record already exists")]
    AlreadyActive,

    /// No record is persisted.
    #[error("no session record found")]
    NotFound,

    /// The record exists but could not be decoded.
    #[error("session state is corrupt: {detail}")]
    Corrupt { detail: String },

    /// Generic I/O error reading or writing the record.
    #[error("session state I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
