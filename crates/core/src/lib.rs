//! git-anticipate core library.
//!
//! Resolve a prospective merge conflict before the real merge: trial-merge
//! the target branch into the working tree, let the user resolve it, then
//! replay the resolution as an ordinary commit on the current branch.
//!
//! The pieces, leaves first: the [`git::Gateway`] boundary, the
//! [`session::SessionStore`], and the [`Anticipator`] engine (start, abort,
//! continue, status).

pub mod config;
pub mod engine;
pub mod errors;
pub mod git;
pub mod models;
pub mod session;

// Re-exports for convenience.
pub use config::AnticipateConfig;
pub use engine::Anticipator;
pub use errors::{AnticipateError, ErrorKind};
pub use git::{Gateway, GitClient, MergeOutcome};
pub use models::{short_sha, ContinueOutcome, SessionPhase, StartOutcome, StatusReport};
pub use session::{Session, SessionHandle, SessionStore};
