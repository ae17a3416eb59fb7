//! `f2clipboard jira`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use f2clipboard_core::config::Settings;
use f2clipboard_core::jira::JiraSummariser;

use crate::output;

#[derive(Args, Debug)]
pub struct JiraArgs {
    /// Jira issue URL or path to an issue JSON file.
    pub source: String,

    /// Also write the summary to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: JiraArgs, settings: &Settings) -> Result<i32> {
    let summariser = JiraSummariser::new(settings).context("failed to set up HTTP clients")?;
    let summary = summariser
        .summarise(&args.source)
        .await
        .with_context(|| format!("failed to summarise Jira issue {}", args.source))?;
    output::emit(&summary, args.output.as_deref())?;
    Ok(0)
}
