//! Durable storage for the single session record of a repository.
//!
//! The record lives at `<git-dir>/anticipate/session.json`. It is written to a
//! temporary file in the same directory and published with a no-clobber
//! persist, so readers never see a half-written record and a second writer
//! loses with [`SessionError::AlreadyActive`].
//!
//! While a resolution is being replayed, the id of the tree object holding it
//! is kept in `resolution-tree` next to the record, so an interrupted replay
//! can be detected and recovered by a later invocation.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::Session;
use crate::errors::SessionError;

const STATE_DIR: &str = "anticipate";
const RECORD_FILE: &str = "session.json";
const RESOLUTION_TREE_FILE: &str = "resolution-tree";

/// Repository-scoped store for the session record.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted in the repository's private metadata directory.
    pub fn new<P: AsRef<Path>>(git_dir: P) -> Self {
        Self {
            dir: git_dir.as_ref().join(STATE_DIR),
        }
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.join(RECORD_FILE)
    }

    /// True iff a session record is currently persisted.
    pub fn exists(&self) -> bool {
        self.record_path().is_file()
    }

    /// Persist `session`, failing if a record already exists.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;

        let path = self.record_path();
        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                SessionError::AlreadyActive
            } else {
                SessionError::Io(e.error)
            }
        })?;

        info!(path = %path.display(), target = %session.target_branch, "saved session");
        Ok(())
    }

    /// Load the persisted session.
    ///
    /// Only the encoding is checked here; whether the fields are usable for a
    /// reset is up to the caller.
    pub fn load(&self) -> Result<Session, SessionError> {
        let path = self.record_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(SessionError::NotFound),
            Err(e) => return Err(SessionError::Io(e)),
        };

        let session: Session =
            serde_json::from_slice(&bytes).map_err(|e| SessionError::Corrupt {
                detail: format!("{}: {}", path.display(), e),
            })?;

        debug!(target = %session.target_branch, "loaded session");
        Ok(session)
    }

    /// Remember the tree holding a resolution that is about to be replayed.
    pub fn record_resolution_tree(&self, tree: &str) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(RESOLUTION_TREE_FILE), tree)?;
        debug!(tree, "recorded resolution tree");
        Ok(())
    }

    /// Tree of a replay that started but never committed, if any.
    pub fn resolution_tree(&self) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(self.dir.join(RESOLUTION_TREE_FILE)) {
            Ok(tree) if !tree.trim().is_empty() => Ok(Some(tree.trim().to_string())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Io(e)),
        }
    }

    /// Remove the record. Best-effort: failures are logged, never returned.
    pub fn clear(&self) {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => info!(path = %self.dir.display(), "cleared session"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.dir.display(), error = %e, "failed to clear session state"),
        }
    }
}
