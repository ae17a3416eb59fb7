//! `f2clipboard merge-resolve`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use f2clipboard_core::config::Settings;
use f2clipboard_core::merge::{MergeResolver, ResolveOptions, ResolveOutcome};
use f2clipboard_core::models::MergeStrategy;
use f2clipboard_core::process::SystemRunner;

use crate::output::ConsoleProgress;
use crate::style;

#[derive(Args, Debug)]
pub struct MergeResolveArgs {
    /// Base ref to merge into the current branch [default: PR base, then
    /// `merge.default_base`].
    #[arg(short, long)]
    pub base: Option<String>,

    /// Conflict strategy: ours, theirs or both (ours, then theirs).
    #[arg(short, long, default_value = "ours")]
    pub strategy: MergeStrategy,

    /// Repository to operate on.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Run validation checks after a successful merge (default).
    #[arg(long, overrides_with = "no_run_checks")]
    pub run_checks: bool,

    /// Skip validation checks after a successful merge.
    #[arg(long, overrides_with = "run_checks")]
    pub no_run_checks: bool,

    /// Pull request number or URL to fetch into `pr-<number>` first.
    #[arg(long)]
    pub pr: Option<String>,
}

pub async fn run(args: MergeResolveArgs, settings: &Settings) -> Result<i32> {
    super::ensure_repo_dir(&args.repo)?;

    let resolver = MergeResolver::new(&args.repo, settings, Arc::new(SystemRunner))
        .context("failed to set up merge-resolve")?;
    let options = ResolveOptions {
        base: args.base,
        strategy: args.strategy,
        run_checks: args.run_checks || !args.no_run_checks,
        pr: args.pr,
    };

    let progress = ConsoleProgress::stdout();
    let outcome = match resolver.resolve(&options, &progress).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{}", style::error(&e.to_string()));
            return Ok(e.exit_code());
        }
    };

    if let ResolveOutcome::Unresolved {
        base,
        conflicts,
        patch,
    } = &outcome
    {
        println!();
        println!("{}", conflicts.to_prompt(base));
        if let Some(patch) = patch {
            println!("{}", style::header("Suggested patch:"));
            println!("{}", patch);
        }
    }
    Ok(outcome.exit_code())
}
