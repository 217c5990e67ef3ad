//! Read-only session introspection.

use super::Anticipator;
use crate::errors::AnticipateError;
use crate::git::Gateway;
use crate::models::{SessionPhase, StatusReport};

impl<G: Gateway> Anticipator<G> {
    /// Report whether a session is active and which paths are still conflicted.
    pub fn status(&self) -> Result<StatusReport, AnticipateError> {
        if !self.store.exists() {
            return Ok(StatusReport::Idle);
        }
        let session = self.load_session()?;
        let unmerged: Vec<String> = self.git.unmerged_paths()?.into_iter().collect();
        let phase = if unmerged.is_empty() {
            SessionPhase::ReadyToCommit
        } else {
            SessionPhase::ConflictPending
        };
        Ok(StatusReport::Active {
            session,
            phase,
            unmerged,
        })
    }
}
