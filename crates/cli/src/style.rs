//! Terminal styling for anticipate output.

use console::{style, Style};

fn marked(mark: &str, color: Style, msg: &str) -> String {
    format!("{} {}", color.apply_to(mark), msg)
}

pub fn success(msg: &str) -> String {
    marked("✓", Style::new().green(), msg)
}

pub fn error(msg: &str) -> String {
    marked("✗", Style::new().red(), msg)
}

pub fn warn(msg: &str) -> String {
    marked("⚠", Style::new().yellow(), msg)
}

/// Section title printed at the top of each subcommand's output.
pub fn header(msg: &str) -> String {
    style(msg).bold().to_string()
}

pub fn dim(msg: &str) -> String {
    style(msg).dim().to_string()
}

/// A still-conflicted path, indented under a file list.
pub fn conflicted(path: &str) -> String {
    format!("    {}", marked("✗", Style::new().red(), path))
}

/// A follow-up command the user should run next.
pub fn command(cmd: &str) -> String {
    format!("  {}", style(cmd).cyan())
}

/// A branch name with an abbreviated revision, e.g. `main (1a2b3c4d)`.
pub fn branch_at(branch: &str, short_rev: &str) -> String {
    format!("{} ({})", style(branch).bold(), style(short_rev).dim())
}
