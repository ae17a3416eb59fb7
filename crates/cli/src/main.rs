//! f2clipboard command-line tool.
//!
//! Provides subcommands for resolving merge conflicts against a base
//! branch, running validation checks, bundling local files as Markdown,
//! turning shared chat transcripts into coding prompts, summarising Jira
//! issues, and collecting the failed CI logs of a Codex task.

mod commands;
mod output;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use f2clipboard_core::config::Settings;

use commands::chat2prompt::Chat2PromptArgs;
use commands::codex_task::CodexTaskArgs;
use commands::files::FilesArgs;
use commands::jira::JiraArgs;
use commands::merge_checks::MergeChecksArgs;
use commands::merge_resolve::MergeResolveArgs;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Bundle merge conflicts, chat transcripts and CI failures into Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "f2clipboard",
    version,
    about = "Merge automation, prompts and CI failure reports for coding assistants"
)]
struct Cli {
    /// Path to the TOML configuration file [default: <config dir>/f2clipboard/config.toml].
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge a base branch, trying conflict strategies and suggesting a patch
    /// when none applies.
    MergeResolve(MergeResolveArgs),

    /// Run the static check on modified files, then the test suite.
    MergeChecks(MergeChecksArgs),

    /// Turn a shared chat transcript into a coding prompt.
    Chat2prompt(Chat2PromptArgs),

    /// Collect the failed check logs of a Codex task's pull request.
    CodexTask(CodexTaskArgs),

    /// Bundle matching local files into a Markdown document.
    Files(FilesArgs),

    /// Summarise a Jira issue from its URL or an exported JSON file.
    Jira(JiraArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::MergeResolve(args) => commands::merge_resolve::run(args, &settings).await,
        Commands::MergeChecks(args) => commands::merge_checks::run(args, &settings).await,
        Commands::Chat2prompt(args) => commands::chat2prompt::run(args, &settings).await,
        Commands::CodexTask(args) => commands::codex_task::run(args, &settings).await,
        Commands::Files(args) => commands::files::run(args),
        Commands::Jira(args) => commands::jira::run(args, &settings).await,
    }
}
