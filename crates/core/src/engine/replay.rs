//! Turning a resolved trial merge into a single commit on the original head.
//!
//! The resolution is captured from the working tree into memory, the trial
//! merge is thrown away with a hard reset, and the captured files are written
//! back and committed. Between the reset and the commit the in-memory
//! snapshot is the only copy of the resolution besides the tree object
//! written just before the reset. That tree's id is recorded next to the
//! session, so a replay that dies half-way is reported instead of being
//! mistaken for an empty resolution on the next `continue`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, Permissions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::Anticipator;
use crate::errors::{AnticipateError, GitError};
use crate::git::Gateway;
use crate::models::ContinueOutcome;
use crate::session::SessionHandle;

/// Final content of one resolved path.
#[derive(Debug)]
enum ResolvedEntry {
    File {
        contents: Vec<u8>,
        permissions: Permissions,
    },
    Symlink(PathBuf),
}

/// Resolved contents keyed by path, plus the paths the resolution deletes.
#[derive(Debug, Default)]
pub(crate) struct ResolutionSnapshot {
    entries: BTreeMap<String, ResolvedEntry>,
    deleted: BTreeSet<String>,
}

impl ResolutionSnapshot {
    /// Read every changed, non-deleted path from the working tree.
    pub(crate) fn capture(
        workdir: &Path,
        changed: &BTreeSet<String>,
        deleted: &BTreeSet<String>,
    ) -> Result<Self, AnticipateError> {
        let mut snapshot = Self {
            entries: BTreeMap::new(),
            deleted: deleted.clone(),
        };
        for path in changed.iter().filter(|p| !deleted.contains(*p)) {
            let entry = read_entry(&workdir.join(path)).map_err(|source| {
                AnticipateError::Snapshot {
                    path: path.clone(),
                    source,
                }
            })?;
            snapshot.entries.insert(path.clone(), entry);
        }
        debug!(
            files = snapshot.entries.len(),
            deleted = snapshot.deleted.len(),
            "captured resolution snapshot"
        );
        Ok(snapshot)
    }

    /// Remove deleted paths, then write captured entries back.
    ///
    /// Deletions go first so a path that turned from a file into a directory
    /// (or back) does not collide with what the reset restored.
    pub(crate) fn write_back(&self, workdir: &Path) -> Result<(), (String, io::Error)> {
        for path in &self.deleted {
            remove_deleted(workdir, path).map_err(|e| (path.clone(), e))?;
        }
        for (path, entry) in &self.entries {
            clear_obstructions(workdir, path)
                .and_then(|()| write_entry(&workdir.join(path), entry))
                .map_err(|e| (path.clone(), e))?;
        }
        Ok(())
    }

    pub(crate) fn written(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn deleted(&self) -> &BTreeSet<String> {
        &self.deleted
    }
}

fn read_entry(path: &Path) -> io::Result<ResolvedEntry> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        return Ok(ResolvedEntry::Symlink(fs::read_link(path)?));
    }
    Ok(ResolvedEntry::File {
        contents: fs::read(path)?,
        permissions: meta.permissions(),
    })
}

fn remove_deleted(workdir: &Path, path: &str) -> io::Result<()> {
    let full = workdir.join(path);
    match fs::symlink_metadata(&full) {
        // Absent, or already replaced by a directory of the resolution.
        Err(_) => return Ok(()),
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => fs::remove_file(&full)?,
    }

    // Drop directories the deletion left empty.
    let mut dir = full.parent();
    while let Some(d) = dir {
        if d == workdir || fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
    Ok(())
}

/// Make room for `path`: a file or link where one of its parent directories
/// belongs is removed, as is an empty directory where the entry itself goes.
fn clear_obstructions(workdir: &Path, path: &str) -> io::Result<()> {
    let components: Vec<_> = Path::new(path).components().collect();
    let mut current = workdir.to_path_buf();
    for (i, component) in components.iter().enumerate() {
        current.push(component);
        let Ok(meta) = fs::symlink_metadata(&current) else {
            break;
        };
        let is_entry = i + 1 == components.len();
        if !is_entry && !meta.is_dir() {
            debug!(path = %current.display(), "removing file in the way of a directory");
            fs::remove_file(&current)?;
            break;
        }
        if is_entry && meta.is_dir() {
            debug!(path = %current.display(), "removing directory in the way of a file");
            fs::remove_dir(&current)?;
        }
    }
    Ok(())
}

fn write_entry(path: &Path, entry: &ResolvedEntry) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // Never write through a link left behind by the reset.
    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() || matches!(entry, ResolvedEntry::Symlink(_)) {
            fs::remove_file(path)?;
        }
    }
    match entry {
        ResolvedEntry::File {
            contents,
            permissions,
        } => {
            fs::write(path, contents)?;
            fs::set_permissions(path, permissions.clone())
        }
        ResolvedEntry::Symlink(target) => create_symlink(target, path),
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, path)
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, path: &Path) -> io::Result<()> {
    // Without symlink support git checks links out as plain files.
    fs::write(path, target.to_string_lossy().as_bytes())
}

impl<G: Gateway> Anticipator<G> {
    /// Replay the user's resolution as one commit on the original head.
    ///
    /// Fails with [`AnticipateError::UnresolvedConflicts`] while any path is
    /// still conflicted. If the commit is rejected (e.g. by a hook) the
    /// session is kept and the resolution stays staged, so `continue` can be
    /// retried.
    pub fn continue_session(
        &self,
        handle: SessionHandle,
        skip_hooks: bool,
    ) -> Result<ContinueOutcome, AnticipateError> {
        let session = handle.into_session();

        let unmerged = self.git.unmerged_paths()?;
        if !unmerged.is_empty() {
            return Err(AnticipateError::UnresolvedConflicts(
                unmerged.into_iter().collect(),
            ));
        }

        self.git.stage_tracked()?;

        let changed = self.git.changed_paths()?;
        if changed.is_empty() {
            if let Some(resolution_tree) = self.store.resolution_tree()? {
                warn!(tree = %resolution_tree, "earlier replay never committed");
                return Err(AnticipateError::ReplayInterrupted { resolution_tree });
            }
            info!("resolution matches the original head; nothing to commit");
            self.git.abort_merge();
            self.git.hard_reset(&session.original_head)?;
            self.store.clear();
            return Ok(ContinueOutcome::NoChanges);
        }
        let deleted: BTreeSet<String> = self
            .git
            .deleted_paths()?
            .intersection(&changed)
            .cloned()
            .collect();

        let snapshot = ResolutionSnapshot::capture(self.git.workdir(), &changed, &deleted)?;
        let resolution_tree = self.git.write_index_tree()?;
        self.store.record_resolution_tree(&resolution_tree)?;
        info!(
            files = changed.len(),
            deleted = deleted.len(),
            tree = %resolution_tree,
            "extracted resolution"
        );

        // Destructive from here on: the trial merge state is gone.
        self.git.abort_merge();
        self.git
            .hard_reset(&session.original_head)
            .map_err(|e| replay_failure(e, &resolution_tree))?;

        snapshot
            .write_back(self.git.workdir())
            .map_err(|(path, e)| AnticipateError::Replay {
                detail: format!("failed to write resolved file {}: {}", path, e),
                resolution_tree: resolution_tree.clone(),
            })?;

        // Removals first, so a file/directory swap never meets its old entry.
        let (removed, written): (Vec<&String>, Vec<&String>) =
            changed.iter().partition(|p| snapshot.deleted().contains(*p));
        for path in removed {
            self.git
                .unstage_path_as_deleted(path)
                .map_err(|e| replay_failure(e, &resolution_tree))?;
        }
        for path in written {
            self.git
                .stage_path(path)
                .map_err(|e| replay_failure(e, &resolution_tree))?;
        }

        let message = self.commit.render_message(
            &session.target_branch,
            &session.target_revision,
            &session.current_branch,
        );
        let sha = self
            .git
            .commit(&message, skip_hooks || self.commit.skip_hooks)
            .map_err(|e| {
                warn!(error = %e, "resolution staged but not committed");
                e
            })?;

        self.store.clear();
        info!(sha = %sha, branch = %session.current_branch, "resolution committed");

        Ok(ContinueOutcome::Committed {
            sha,
            branch: session.current_branch,
            target_branch: session.target_branch,
            written: snapshot.written(),
            deleted: snapshot.deleted().len(),
        })
    }
}

fn replay_failure(err: GitError, resolution_tree: &str) -> AnticipateError {
    AnticipateError::Replay {
        detail: err.to_string(),
        resolution_tree: resolution_tree.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fake::FakeGateway;
    use crate::session::{Session, SessionStore};

    fn setup() -> (tempfile::TempDir, Anticipator<FakeGateway>) {
        let dir = tempfile::tempdir().unwrap();
        let git = FakeGateway::new(dir.path());
        let store = SessionStore::new(dir.path().join(".git"));
        store
            .save(&Session::new("main", "b".repeat(40), "a".repeat(40), "feature"))
            .unwrap();
        (dir, Anticipator::new(git, store))
    }

    fn set_changes(engine: &Anticipator<FakeGateway>, changed: &[&str], deleted: &[&str]) {
        let mut state = engine.gateway().state.borrow_mut();
        state.changed = changed.iter().map(|s| s.to_string()).collect();
        state.deleted = deleted.iter().map(|s| s.to_string()).collect();
    }

    #[test]
    fn test_unresolved_conflicts_are_refused() {
        let (_dir, engine) = setup();
        engine
            .gateway()
            .state
            .borrow_mut()
            .unmerged
            .insert("a.txt".into());

        let handle = engine.open_session().unwrap();
        let err = engine.continue_session(handle, false).unwrap_err();
        assert!(matches!(err, AnticipateError::UnresolvedConflicts(ref p) if p == &vec!["a.txt".to_string()]));
        assert!(engine.gateway().calls().is_empty());
        assert!(engine.store().exists());
    }

    #[test]
    fn test_no_net_change_clears_session() {
        let (_dir, engine) = setup();
        let handle = engine.open_session().unwrap();
        assert_eq!(
            engine.continue_session(handle, false).unwrap(),
            ContinueOutcome::NoChanges
        );
        assert!(!engine.store().exists());
        assert_eq!(
            engine.gateway().calls(),
            vec![
                "add -u".to_string(),
                "merge --abort".to_string(),
                format!("reset {}", "a".repeat(40)),
            ]
        );
    }

    #[test]
    fn test_replay_order_and_deleted_paths_are_not_read() {
        let (dir, engine) = setup();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/nested/lib.rs"), b"resolved\n").unwrap();
        fs::write(dir.path().join("blob.bin"), [0u8, 159, 146, 150, 255]).unwrap();
        // gone.txt is deliberately absent from the working tree.
        set_changes(&engine, &["blob.bin", "gone.txt", "src/nested/lib.rs"], &["gone.txt"]);

        let handle = engine.open_session().unwrap();
        let outcome = engine.continue_session(handle, false).unwrap();
        assert_eq!(
            outcome,
            ContinueOutcome::Committed {
                sha: "e".repeat(40),
                branch: "feature".into(),
                target_branch: "main".into(),
                written: 2,
                deleted: 1,
            }
        );
        assert!(!engine.store().exists());
        assert_eq!(
            fs::read(dir.path().join("blob.bin")).unwrap(),
            vec![0u8, 159, 146, 150, 255]
        );

        let calls = engine.gateway().calls();
        assert_eq!(
            calls,
            vec![
                "add -u".to_string(),
                "write-tree".to_string(),
                "merge --abort".to_string(),
                format!("reset {}", "a".repeat(40)),
                "rm gone.txt".to_string(),
                "add blob.bin".to_string(),
                "add src/nested/lib.rs".to_string(),
                "commit Preemptive conflict resolution vs main@bbbbbbbb skip_hooks=false"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_resolved_file_fails_before_reset() {
        let (_dir, engine) = setup();
        set_changes(&engine, &["vanished.txt"], &[]);

        let handle = engine.open_session().unwrap();
        let err = engine.continue_session(handle, false).unwrap_err();
        assert!(matches!(err, AnticipateError::Snapshot { ref path, .. } if path == "vanished.txt"));
        assert_eq!(engine.gateway().calls(), vec!["add -u"]);
        assert!(engine.store().exists());
    }

    #[test]
    fn test_rejected_commit_keeps_session_for_retry() {
        let (dir, engine) = setup();
        fs::write(dir.path().join("a.txt"), "third\n").unwrap();
        set_changes(&engine, &["a.txt"], &[]);
        engine.gateway().state.borrow_mut().reject_commit = true;

        let handle = engine.open_session().unwrap();
        let err = engine.continue_session(handle, false).unwrap_err();
        assert!(matches!(
            err,
            AnticipateError::Git(GitError::CommitRejected { .. })
        ));
        assert!(engine.store().exists());
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "third\n");

        let handle = engine.open_session().unwrap();
        let outcome = engine.continue_session(handle, true).unwrap();
        assert!(matches!(outcome, ContinueOutcome::Committed { .. }));
        assert!(!engine.store().exists());
    }

    #[test]
    fn test_failed_reset_reports_resolution_tree() {
        let (dir, engine) = setup();
        fs::write(dir.path().join("a.txt"), "third\n").unwrap();
        set_changes(&engine, &["a.txt"], &[]);
        engine.gateway().state.borrow_mut().fail_reset = true;

        let handle = engine.open_session().unwrap();
        let err = engine.continue_session(handle, false).unwrap_err();
        match err {
            AnticipateError::Replay {
                resolution_tree, ..
            } => assert_eq!(resolution_tree, "d".repeat(40)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.store().exists());
        assert_eq!(engine.store().resolution_tree().unwrap(), Some("d".repeat(40)));
    }

    #[test]
    fn test_interrupted_replay_is_not_taken_for_no_changes() {
        let (_dir, engine) = setup();
        engine.store().record_resolution_tree(&"d".repeat(40)).unwrap();

        let handle = engine.open_session().unwrap();
        let err = engine.continue_session(handle, false).unwrap_err();
        match err {
            AnticipateError::ReplayInterrupted { resolution_tree } => {
                assert_eq!(resolution_tree, "d".repeat(40))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.store().exists());
        assert_eq!(engine.gateway().calls(), vec!["add -u"]);
    }

    #[test]
    fn test_write_back_across_file_directory_swaps() {
        // Resolution: file `foo` became `foo/bar`, directory `dir/` became file `dir`.
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("foo")).unwrap();
        fs::write(src.path().join("foo/bar"), "now nested\n").unwrap();
        fs::write(src.path().join("dir"), "now a file\n").unwrap();
        let changed: BTreeSet<String> = ["dir", "dir/inner.txt", "foo", "foo/bar"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let deleted: BTreeSet<String> = ["dir/inner.txt", "foo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let snapshot = ResolutionSnapshot::capture(src.path(), &changed, &deleted).unwrap();

        // Working tree as the reset leaves it.
        let dst = tempfile::tempdir().unwrap();
        fs::write(dst.path().join("foo"), "old file\n").unwrap();
        fs::create_dir_all(dst.path().join("dir")).unwrap();
        fs::write(dst.path().join("dir/inner.txt"), "old nested\n").unwrap();

        snapshot.write_back(dst.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dst.path().join("foo/bar")).unwrap(),
            "now nested\n"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("dir")).unwrap(),
            "now a file\n"
        );

        // Writing back again over the finished state is harmless.
        snapshot.write_back(dst.path()).unwrap();
        assert!(dst.path().join("foo").is_dir());
        assert!(dst.path().join("dir").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_snapshot_preserves_mode_and_symlinks() {
        use std::os::unix::fs::PermissionsExt;

        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("run.sh"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(src.path().join("run.sh"), Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("run.sh", src.path().join("link")).unwrap();

        let changed: BTreeSet<String> = ["link".to_string(), "run.sh".to_string()].into();
        let snapshot = ResolutionSnapshot::capture(src.path(), &changed, &BTreeSet::new()).unwrap();

        // A stale regular file where the link belongs must be replaced.
        fs::write(dst.path().join("link"), "stale").unwrap();
        snapshot.write_back(dst.path()).unwrap();

        let mode = fs::metadata(dst.path().join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(
            fs::read_link(dst.path().join("link")).unwrap(),
            PathBuf::from("run.sh")
        );
    }
}
