//! Conflict capture after a failed merge attempt.

use tracing::warn;

use crate::git::GitClient;
use crate::models::ConflictDetails;
use crate::progress::Progress;

/// List unmerged paths and capture their diff.
///
/// Both halves are best-effort: a failing `git` call is reported as a
/// warning and yields an empty list or an empty diff.
pub async fn collect_conflicts(git: &GitClient, progress: &dyn Progress) -> ConflictDetails {
    let files = match git.unmerged_files().await {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, "could not list unmerged files");
            progress.warn(&format!("Could not list unmerged files: {}", e));
            Vec::new()
        }
    };

    let diff = match git.unmerged_diff().await {
        Ok(diff) => diff.trim().to_string(),
        Err(e) => {
            warn!(error = %e, "could not capture conflict diff");
            progress.warn(&format!("Could not capture conflict diff: {}", e));
            String::new()
        }
    };

    ConflictDetails { files, diff }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::process::fake::FakeRunner;
    use crate::progress::recording::RecordingProgress;

    #[tokio::test]
    async fn test_collects_files_and_diff() {
        let runner = FakeRunner::new()
            .on("git diff --name-only", 0, "a.txt\nb.txt\n")
            .on("git --no-pager diff", 0, "diff --cc a.txt\n");
        let git = GitClient::new("/repo", Arc::new(runner));
        let progress = RecordingProgress::default();

        let details = collect_conflicts(&git, &progress).await;
        assert_eq!(details.files, vec!["a.txt", "b.txt"]);
        assert_eq!(details.diff, "diff --cc a.txt");
        assert!(progress.lines().is_empty());
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty() {
        let runner = FakeRunner::new()
            .on("git diff --name-only", 128, "")
            .on_missing("git --no-pager");
        let git = GitClient::new("/repo", Arc::new(runner));
        let progress = RecordingProgress::default();

        let details = collect_conflicts(&git, &progress).await;
        assert!(details.is_empty());
        assert!(progress.contains("warn: Could not list unmerged files"));
        assert!(progress.contains("warn: Could not capture conflict diff"));
    }
}
