//! `f2clipboard merge-checks`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use f2clipboard_core::checks::{relative_to_repo, CheckRunner};
use f2clipboard_core::config::Settings;
use f2clipboard_core::process::SystemRunner;

use crate::output::ConsoleProgress;

#[derive(Args, Debug)]
pub struct MergeChecksArgs {
    /// File to check; repeatable. Defaults to the modified files.
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    /// Repository to operate on.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
}

pub async fn run(args: MergeChecksArgs, settings: &Settings) -> Result<i32> {
    super::ensure_repo_dir(&args.repo)?;

    let files = if args.files.is_empty() {
        None
    } else {
        Some(relative_to_repo(&args.repo, &args.files))
    };

    let runner = CheckRunner::new(&args.repo, Arc::new(SystemRunner), &settings.checks);
    let code = runner
        .run_checks(files, &ConsoleProgress::stdout())
        .await
        .context("merge checks could not run")?;
    Ok(code)
}
