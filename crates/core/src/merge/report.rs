//! Upstream status reporting on the pull request.

use tracing::{info, warn};

use crate::git::{GitHubClient, RepoSlug};
use crate::models::{BestEffort, MergeStrategy};

/// Outcome summaries posted as PR comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessage {
    /// No strategy merged cleanly.
    Unresolved,
    /// Merged, but validation exited non-zero.
    ChecksFailed { strategy: MergeStrategy, exit_code: i32 },
    /// Merged and validation passed.
    ChecksPassed { strategy: MergeStrategy },
    /// Merged, validation not run.
    ChecksSkipped { strategy: MergeStrategy },
}

impl StatusMessage {
    pub fn body(&self) -> String {
        match self {
            Self::Unresolved => "⚠️ `f2clipboard merge-resolve` could not resolve the merge \
                                 automatically. Manual conflict resolution is required."
                .to_string(),
            Self::ChecksFailed {
                strategy,
                exit_code,
            } => format!(
                "❌ `f2clipboard merge-resolve` completed automatically using the `{}` \
                 strategy, but merge checks failed with exit code {}. Please review the \
                 check output and address any issues.",
                strategy, exit_code
            ),
            Self::ChecksPassed { strategy } => format!(
                "✅ `f2clipboard merge-resolve` completed automatically using the `{}` \
                 strategy. Merge checks were executed successfully.",
                strategy
            ),
            Self::ChecksSkipped { strategy } => format!(
                "✅ `f2clipboard merge-resolve` completed automatically using the `{}` \
                 strategy. Remember to run validation checks before pushing.",
                strategy
            ),
        }
    }
}

/// Posts [`StatusMessage`]s; never fails the caller.
pub struct StatusReporter {
    github: GitHubClient,
}

impl StatusReporter {
    pub fn new(github: GitHubClient) -> Self {
        Self { github }
    }

    /// Comment on `repo#number`. Skipped without a token; transport and API
    /// errors come back as [`BestEffort::Failed`].
    pub async fn post_status(
        &self,
        repo: &RepoSlug,
        number: u64,
        message: StatusMessage,
    ) -> BestEffort<()> {
        if !self.github.has_token() {
            info!(%repo, number, "no GitHub token, skipping status comment");
            return BestEffort::Skipped(
                "Skipping PR comment because GITHUB_TOKEN is not configured.".to_string(),
            );
        }

        match self
            .github
            .create_issue_comment(repo, number, &message.body())
            .await
        {
            Ok(_) => BestEffort::Done(()),
            Err(e) => {
                warn!(%repo, number, error = %e, "failed to post status comment");
                BestEffort::Failed(format!("Failed to post PR comment: {}", e))
            }
        }
    }
}
