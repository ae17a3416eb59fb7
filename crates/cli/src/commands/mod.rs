//! Subcommand implementations. Each returns the process exit code.

use std::path::Path;

use anyhow::{bail, Result};

pub mod chat2prompt;
pub mod codex_task;
pub mod files;
pub mod jira;
pub mod merge_checks;
pub mod merge_resolve;

/// Reject a `--repo` that is missing or not a directory before any
/// process is spawned inside it.
pub fn ensure_repo_dir(repo: &Path) -> Result<()> {
    if !repo.is_dir() {
        bail!(
            "repository path '{}' does not exist or is not a directory",
            repo.display()
        );
    }
    Ok(())
}
