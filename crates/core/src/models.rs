//! Shared data types for the merge workflow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MergeStrategy
// ---------------------------------------------------------------------------

/// Conflict-resolution policy passed to `git merge -X`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Prefer the current branch on conflicting hunks.
    #[default]
    Ours,
    /// Prefer the base branch on conflicting hunks.
    Theirs,
    /// Try `Ours`, then `Theirs` if it failed.
    Both,
}

impl MergeStrategy {
    /// The ordered sequence of concrete strategies to attempt.
    pub fn expand(self) -> &'static [MergeStrategy] {
        match self {
            Self::Ours => &[Self::Ours],
            Self::Theirs => &[Self::Theirs],
            Self::Both => &[Self::Ours, Self::Theirs],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ours => "ours",
            Self::Theirs => "theirs",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ours" => Ok(Self::Ours),
            "theirs" => Ok(Self::Theirs),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown merge strategy: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// Unmerged paths and their diff, captured after a failed attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictDetails {
    pub files: Vec<String>,
    pub diff: String,
}

impl ConflictDetails {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.diff.trim().is_empty()
    }

    /// Merge several captures into one: files deduplicated in first-seen
    /// order, non-empty diffs joined by a blank line.
    pub fn combine<'a, I>(details: I) -> Self
    where
        I: IntoIterator<Item = &'a ConflictDetails>,
    {
        let mut combined = ConflictDetails::default();
        let mut diffs = Vec::new();
        for detail in details {
            for file in &detail.files {
                if !combined.files.contains(file) {
                    combined.files.push(file.clone());
                }
            }
            let diff = detail.diff.trim();
            if !diff.is_empty() {
                diffs.push(diff.to_string());
            }
        }
        combined.diff = diffs.join("\n\n");
        combined
    }

    /// Render a Markdown prompt a human or an agent can resolve from.
    pub fn to_prompt(&self, base: &str) -> String {
        let mut out = String::new();
        out.push_str("### Merge conflicts\n\n");
        out.push_str(&format!(
            "Merging `{}` could not be completed automatically.\n",
            base
        ));
        if !self.files.is_empty() {
            out.push_str("\n**Unmerged files:**\n");
            for file in &self.files {
                out.push_str(&format!("- `{}`\n", file));
            }
        }
        if !self.diff.trim().is_empty() {
            out.push_str("\n```diff\n");
            out.push_str(self.diff.trim_end());
            out.push_str("\n```\n");
        }
        out
    }
}

/// Outcome of one concrete strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub succeeded: bool,
    pub strategy: MergeStrategy,
    /// Present only for failed attempts.
    pub conflict: Option<ConflictDetails>,
}

impl AttemptResult {
    pub fn success(strategy: MergeStrategy) -> Self {
        Self {
            succeeded: true,
            strategy,
            conflict: None,
        }
    }

    pub fn failure(strategy: MergeStrategy, conflict: ConflictDetails) -> Self {
        Self {
            succeeded: false,
            strategy,
            conflict: Some(conflict),
        }
    }

    /// The captured diff, if any text was collected.
    pub fn diff(&self) -> Option<&str> {
        self.conflict
            .as_ref()
            .map(|c| c.diff.as_str())
            .filter(|d| !d.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Best-effort results
// ---------------------------------------------------------------------------

/// Outcome of an auxiliary step whose failure must not abort the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum BestEffort<T> {
    Done(T),
    /// The step did not run (e.g. no credential configured).
    Skipped(String),
    /// The step ran and failed; the workflow continues.
    Failed(String),
}

impl<T> BestEffort<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Skipped(_) | Self::Failed(_) => None,
        }
    }
}
