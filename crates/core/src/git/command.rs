//! Thin wrapper around the `git` executable.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::errors::GitError;

/// Captured result of a finished git invocation.
#[derive(Debug, Clone)]
pub(crate) struct GitOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Stdout and stderr joined, trimmed.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim().to_string();
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

/// Runs git subcommands inside a working tree.
#[derive(Debug, Clone)]
pub(crate) struct GitCommand {
    binary: String,
    workdir: PathBuf,
}

impl GitCommand {
    pub fn new(binary: impl Into<String>, workdir: &Path) -> Self {
        Self {
            binary: binary.into(),
            workdir: workdir.to_path_buf(),
        }
    }

    /// Run `git <args>` and capture its output, whatever the exit status.
    pub fn output(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.workdir)
            .args(args)
            // Never block on credential or editor prompts.
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_MERGE_AUTOEDIT", "no")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = ?format!("git {}", args.join(" ")), "running git command");
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound(self.binary.clone())
            } else {
                GitError::IoError(e)
            }
        })?;

        Ok(GitOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run `git <args>`, failing on a non-zero exit status.
    pub fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.output(args)?;
        if !output.success {
            let stderr = output.stderr.trim().to_string();
            warn!(exit_code = output.exit_code, %stderr, "git command failed");
            return Err(GitError::CommandFailed {
                args: args.join(" "),
                exit_code: output.exit_code,
                stderr,
            });
        }
        Ok(output.stdout)
    }
}
