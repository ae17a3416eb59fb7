//! `f2clipboard chat2prompt`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use f2clipboard_core::config::Settings;
use f2clipboard_core::transcript::{build_prompt, TranscriptFetcher};

use crate::output;

#[derive(Args, Debug)]
pub struct Chat2PromptArgs {
    /// Shared chat transcript URL.
    pub url: String,

    /// Assistant platform named in the prompt.
    #[arg(short, long, default_value = "codex")]
    pub platform: String,

    /// HTTP timeout in seconds [default: `limits.http_timeout_secs`].
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Also write the prompt to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: Chat2PromptArgs, settings: &Settings) -> Result<i32> {
    let timeout = args.timeout.unwrap_or(settings.limits.http_timeout_secs);
    let fetcher = TranscriptFetcher::new(timeout)?;
    let transcript = fetcher
        .fetch(&args.url)
        .await
        .with_context(|| format!("failed to fetch transcript from {}", args.url))?;
    info!(chars = transcript.len(), "transcript extracted");

    let prompt = build_prompt(&transcript, &args.platform);
    output::emit(&prompt, args.output.as_deref())?;
    Ok(0)
}
