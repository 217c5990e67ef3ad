//! Git access for git-anticipate.
//!
//! [`Gateway`] is the boundary the engines are written against; [`GitClient`]
//! implements it on top of `git2` for queries and the `git` binary for the
//! operations that must behave exactly like the user's own git (merge state,
//! hooks, resets).

pub mod client;
mod command;
pub mod gateway;

#[cfg(test)]
pub(crate) mod fake;

pub use client::GitClient;
pub use gateway::{Gateway, MergeOutcome};
