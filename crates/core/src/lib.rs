//! f2clipboard core library.
//!
//! This crate provides the pieces behind the `f2clipboard` commands:
//! merge-conflict auto-resolution, validation checks, secret redaction,
//! LLM helpers, local file bundles, chat transcript conversion, Jira issue
//! summaries and Codex task reports.

pub mod checks;
pub mod codex;
pub mod config;
pub mod errors;
pub mod files;
pub mod git;
pub mod jira;
pub mod llm;
pub mod merge;
pub mod models;
pub mod process;
pub mod progress;
pub mod secrets;
pub mod transcript;

// Re-exports for convenience.
pub use checks::CheckRunner;
pub use codex::{CodexReport, CodexTaskProcessor};
pub use config::Settings;
pub use errors::CoreError;
pub use files::FileSelector;
pub use jira::JiraSummariser;
pub use merge::{MergeResolver, ResolveOptions, ResolveOutcome};
pub use models::{BestEffort, ConflictDetails, MergeStrategy};
pub use process::{ProcessRunner, SystemRunner};
pub use progress::Progress;
pub use secrets::redact;
pub use transcript::TranscriptFetcher;
