//! `f2clipboard codex-task`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use f2clipboard_core::codex::CodexTaskProcessor;
use f2clipboard_core::config::Settings;

use crate::output::{self, ConsoleProgress};

#[derive(Args, Debug)]
pub struct CodexTaskArgs {
    /// Codex task page URL.
    pub url: String,

    /// Also write the Markdown report to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: CodexTaskArgs, settings: &Settings) -> Result<i32> {
    let processor = CodexTaskProcessor::new(settings).context("failed to set up HTTP clients")?;
    let report = processor
        .process(&args.url, &ConsoleProgress::stderr())
        .await
        .with_context(|| format!("failed to process Codex task {}", args.url))?;
    output::emit(&report.render_markdown(), args.output.as_deref())?;
    Ok(0)
}
