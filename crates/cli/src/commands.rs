//! Subcommand implementations: start, continue, abort, status.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::debug;

use anticipate_core::errors::EXIT_CONFLICTS;
use anticipate_core::{
    short_sha, Anticipator, ContinueOutcome, Gateway, SessionPhase, StartOutcome, StatusReport,
};

use crate::style;

pub fn cmd_start<G: Gateway>(engine: &Anticipator<G>, target: &str) -> Result<ExitCode> {
    println!("{}", style::header("git-anticipate: Preemptive conflict resolution"));
    let outcome = engine.start(target)?;

    if let Some(handle) = outcome.session() {
        println!("Current branch: {}", handle.session().current_branch);
    }
    println!("Target branch: {}", target);
    if let Some(base) = outcome.merge_base() {
        println!("Merge base: {}", short_sha(base));
    }
    println!();

    match outcome {
        StartOutcome::ConflictsPending {
            session, conflicts, ..
        } => {
            debug!(current = %session.session().current_branch, "conflicts pending");
            println!("{}", style::warn("Conflicts detected!"));
            println!();
            if !conflicts.is_empty() {
                println!("Conflicting files ({}):", conflicts.len());
                for path in &conflicts {
                    println!("{}", style::conflicted(path));
                }
                println!();
            }
            println!("Resolve conflicts in your working directory, then:");
            println!("{}", style::command("git add <resolved-files>"));
            println!("{}", style::command("git anticipate continue"));
            println!();
            println!("Or to abort:");
            println!("{}", style::command("git anticipate abort"));
            Ok(ExitCode::from(EXIT_CONFLICTS))
        }
        StartOutcome::ReadyToCommit { session, .. } => {
            println!("{}", style::success("No conflicts detected!"));
            println!();
            println!(
                "Changes from {} are staged on {}. To apply as a preparation commit:",
                session.session().target_branch,
                session.session().current_branch
            );
            println!("{}", style::command("git anticipate continue"));
            println!();
            println!("Or to abort:");
            println!("{}", style::command("git anticipate abort"));
            Ok(ExitCode::SUCCESS)
        }
        StartOutcome::NoChanges { .. } => {
            println!(
                "{}",
                style::success("No conflicts and no changes - branches are already compatible!")
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub fn cmd_continue<G: Gateway>(engine: &Anticipator<G>, skip_hooks: bool) -> Result<ExitCode> {
    let handle = engine.open_session()?;
    println!("{}", style::header("git-anticipate: Applying resolution"));
    println!();

    match engine.continue_session(handle, skip_hooks)? {
        ContinueOutcome::NoChanges => {
            println!(
                "{}",
                style::success("No changes to commit - branches are compatible!")
            );
        }
        ContinueOutcome::Committed {
            sha,
            branch,
            target_branch,
            written,
            deleted,
        } => {
            println!(
                "{}",
                style::success(&format!(
                    "Extracted resolution ({} written, {} deleted)",
                    written, deleted
                ))
            );
            println!(
                "{}",
                style::success(&format!("Resolution committed to {} as {}", branch, short_sha(&sha)))
            );
            println!();
            println!("Your branch is now prepared for merging {}", target_branch);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_abort<G: Gateway>(engine: &Anticipator<G>) -> Result<ExitCode> {
    let handle = engine.open_session()?;
    let original_head = handle.session().original_head.clone();
    println!("{}", style::header("git-anticipate: Aborting"));
    println!();

    engine
        .abort(handle)
        .context("failed to restore original state")?;
    println!(
        "{}",
        style::success(&format!(
            "Anticipate aborted. Restored to {}.",
            short_sha(&original_head)
        ))
    );
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_status<G: Gateway>(engine: &Anticipator<G>, json: bool) -> Result<ExitCode> {
    let report = engine.status()?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialize status")?;
        println!("{}", rendered);
        return Ok(ExitCode::SUCCESS);
    }

    match report {
        StatusReport::Idle => {
            println!("No anticipate in progress.");
            println!();
            println!("Usage: git anticipate start <target-branch>");
        }
        StatusReport::Active {
            session,
            phase,
            unmerged,
        } => {
            println!("{}", style::header("git-anticipate: In Progress"));
            println!();
            println!("  Current branch  : {}", session.current_branch);
            println!(
                "  Target branch   : {}",
                style::branch_at(&session.target_branch, &short_sha(&session.target_revision))
            );
            println!("  Original HEAD   : {}", short_sha(&session.original_head));
            if let Some(started_at) = session.started_at {
                println!(
                    "  Started at      : {}",
                    style::dim(&started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                );
            }
            println!();

            match phase {
                SessionPhase::ConflictPending => {
                    println!(
                        "{}",
                        style::warn(&format!("Unresolved conflicts ({}):", unmerged.len()))
                    );
                    for path in &unmerged {
                        println!("{}", style::conflicted(path));
                    }
                    println!();
                    println!("Resolve conflicts, then:");
                    println!("{}", style::command("git add <resolved-files>"));
                    println!("{}", style::command("git anticipate continue"));
                }
                SessionPhase::ReadyToCommit => {
                    println!("{}", style::success("All conflicts resolved!"));
                    println!();
                    println!("Run 'git anticipate continue' to apply resolution");
                }
            }
            println!();
            println!("Or run 'git anticipate abort' to cancel");
        }
    }
    Ok(ExitCode::SUCCESS)
}
