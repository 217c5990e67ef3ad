//! git-anticipate: resolve merge conflicts before they happen.
//!
//! Performs a trial merge of a target branch in the working tree, lets the
//! user resolve the conflicts, and then applies the resolution as a regular
//! commit on the current branch so the eventual real merge is conflict-free.

mod commands;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use anticipate_core::errors::EXIT_ERROR;
use anticipate_core::{AnticipateConfig, AnticipateError, Anticipator, GitClient};

/// Environment variable overriding the configured log filter.
const LOG_ENV: &str = "GIT_ANTICIPATE_LOG";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Preemptively resolve merge conflicts in-place.
#[derive(Parser, Debug)]
#[command(
    name = "git-anticipate",
    version,
    about = "Preemptively resolve merge conflicts in-place",
    long_about = "git-anticipate helps you resolve merge conflicts before they happen.\n\n\
                  It performs a trial merge in your working directory, lets you resolve\n\
                  conflicts, and then applies your resolution as a regular commit."
)]
struct Cli {
    /// Run as if started in <path>.
    #[arg(short = 'C', global = true, value_name = "path", default_value = ".")]
    repo: PathBuf,

    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start anticipating conflicts with a target branch.
    Start {
        /// Branch (or any commit-ish) to trial-merge.
        target: String,
    },

    /// Apply the resolved conflicts as a commit.
    Continue {
        /// Skip pre-commit and commit-msg hooks.
        #[arg(long, visible_alias = "no-verify")]
        skip_hooks: bool,
    },

    /// Abort and restore the original state.
    Abort,

    /// Show the current anticipate status.
    Status {
        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging("warn");
            eprintln!("{}", style::error(&format!("{:#}", e)));
            return ExitCode::from(EXIT_ERROR);
        }
    };
    init_logging(&config.log_level);

    // `status` reports problems but always exits 0.
    let status_only = matches!(cli.command, Some(Commands::Status { .. }));

    match run(cli, &config) {
        Ok(code) => code,
        Err(e) => {
            report_error(&e);
            if status_only {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(exit_code_for(&e))
            }
        }
    }
}

fn run(cli: Cli, config: &AnticipateConfig) -> Result<ExitCode> {
    let engine = open_repository(&cli.repo, config)?;

    match cli.command {
        Some(Commands::Start { target }) => commands::cmd_start(&engine, &target),
        Some(Commands::Continue { skip_hooks }) => commands::cmd_continue(&engine, skip_hooks),
        Some(Commands::Abort) => commands::cmd_abort(&engine),
        Some(Commands::Status { json }) => commands::cmd_status(&engine, json),
        None => {
            if engine.store().exists() {
                return commands::cmd_status(&engine, false);
            }
            eprintln!("usage: git anticipate start <target-branch>");
            eprintln!("       git anticipate continue | abort | status");
            Ok(ExitCode::from(EXIT_ERROR))
        }
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Load an explicit config file, or the default one if it exists.
fn load_config(explicit: Option<&Path>) -> Result<AnticipateConfig> {
    let config = match explicit {
        Some(path) => AnticipateConfig::load_from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => match default_config_path() {
            Some(path) => AnticipateConfig::load_or_default(&path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => AnticipateConfig::default(),
        },
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("git-anticipate").join("config.toml"))
}

fn open_repository(path: &Path, config: &AnticipateConfig) -> Result<Anticipator<GitClient>> {
    Anticipator::discover(path, config).context("failed to open git repository")
}

// ---------------------------------------------------------------------------
// Error reporting
// ---------------------------------------------------------------------------

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<AnticipateError>() {
        Some(AnticipateError::UnresolvedConflicts(paths)) => {
            println!("{}", style::warn("Unresolved conflicts remain:"));
            for path in paths {
                println!("{}", style::conflicted(path));
            }
            println!();
        }
        _ => eprintln!("{}", style::error(&format!("Error: {:#}", err))),
    }
    if let Some(hint) = err.downcast_ref::<AnticipateError>().and_then(|e| e.hint()) {
        eprintln!();
        eprintln!("{}", style::dim(&format!("Tip: {}", hint)));
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<AnticipateError>()
        .map(AnticipateError::exit_code)
        .unwrap_or(EXIT_ERROR)
}
