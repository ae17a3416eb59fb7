//! Merge-conflict auto-resolution.
//!
//! [`engine`] tries strategies against a base ref, [`collector`] captures
//! what conflicted, [`report`] posts the outcome to the pull request and
//! [`resolve`] sequences the whole workflow.

pub mod collector;
pub mod engine;
pub mod report;
pub mod resolve;

pub use collector::collect_conflicts;
pub use engine::{MergeAttempts, MergeEngine};
pub use report::{StatusMessage, StatusReporter};
pub use resolve::{MergeResolver, ResolveOptions, ResolveOutcome};
