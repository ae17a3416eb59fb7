//! Merge attempts against a base ref.
//!
//! The working tree is the only shared resource. It is protected by
//! procedure rather than by a lock: [`MergeEngine::ensure_clean_worktree`]
//! runs before anything is mutated, and every failed attempt is followed by
//! `git merge --abort`. An abort that fails is fatal because the tree is left
//! in an unknown state.

use tracing::{info, instrument, warn};

use super::collector::collect_conflicts;
use crate::errors::MergeError;
use crate::git::GitClient;
use crate::models::{AttemptResult, ConflictDetails, MergeStrategy};
use crate::progress::Progress;

/// Result of running a (possibly compound) strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAttempts {
    /// The concrete strategy that succeeded, if any.
    pub succeeded: Option<MergeStrategy>,
    /// Every attempt in the order it ran.
    pub attempts: Vec<AttemptResult>,
}

impl MergeAttempts {
    /// All captured conflicts merged into one record; diffs joined by a
    /// blank line.
    pub fn conflicts(&self) -> ConflictDetails {
        ConflictDetails::combine(self.attempts.iter().filter_map(|a| a.conflict.as_ref()))
    }
}

#[derive(Clone)]
pub struct MergeEngine {
    git: GitClient,
}

impl MergeEngine {
    pub fn new(git: GitClient) -> Self {
        Self { git }
    }

    /// Fail if a merge is in progress or the tree has any changes,
    /// untracked files included.
    #[instrument(skip(self))]
    pub async fn ensure_clean_worktree(&self) -> Result<(), MergeError> {
        if self.git.merge_in_progress().await? {
            return Err(MergeError::MergeInProgress);
        }
        let status = self.git.status_porcelain().await?;
        if !status.trim().is_empty() {
            return Err(MergeError::DirtyWorktree);
        }
        Ok(())
    }

    /// Attempt a merge of `base` with `strategy`.
    ///
    /// A concrete strategy runs once. `Both` runs the expanded sequence and
    /// reports the successful attempt, or the last failure with every
    /// captured conflict combined.
    pub async fn attempt_merge(
        &self,
        base: &str,
        strategy: MergeStrategy,
        progress: &dyn Progress,
    ) -> Result<AttemptResult, MergeError> {
        if strategy != MergeStrategy::Both {
            return self.attempt_single(base, strategy, progress).await;
        }
        let run = self.attempt_strategies(base, strategy, progress).await?;
        Ok(match run.succeeded {
            Some(won) => AttemptResult::success(won),
            None => AttemptResult::failure(MergeStrategy::Theirs, run.conflicts()),
        })
    }

    /// Run `strategy.expand()` in order, stopping at the first success.
    pub async fn attempt_strategies(
        &self,
        base: &str,
        strategy: MergeStrategy,
        progress: &dyn Progress,
    ) -> Result<MergeAttempts, MergeError> {
        let mut attempts = Vec::new();
        for &current in strategy.expand() {
            let result = self.attempt_single(base, current, progress).await?;
            let succeeded = result.succeeded;
            attempts.push(result);
            if succeeded {
                return Ok(MergeAttempts {
                    succeeded: Some(current),
                    attempts,
                });
            }
        }
        Ok(MergeAttempts {
            succeeded: None,
            attempts,
        })
    }

    #[instrument(skip(self, progress))]
    async fn attempt_single(
        &self,
        base: &str,
        strategy: MergeStrategy,
        progress: &dyn Progress,
    ) -> Result<AttemptResult, MergeError> {
        progress.info(&format!(
            "Attempting merge with strategy '{}' from {}…",
            strategy, base
        ));
        let code = self.git.merge_no_commit(strategy.as_str(), base).await?;
        if code == 0 {
            info!(%strategy, base, "merge succeeded");
            return Ok(AttemptResult::success(strategy));
        }

        warn!(%strategy, exit_code = code, "merge attempt failed");
        progress.warn(&format!(
            "Merge with strategy '{}' failed (exit code {}).",
            strategy, code
        ));
        let conflict = collect_conflicts(&self.git, progress).await;

        match self.git.merge_abort().await {
            Ok(0) => Ok(AttemptResult::failure(strategy, conflict)),
            Ok(code) => Err(MergeError::AbortFailed {
                detail: format!("git merge --abort exited with {}", code),
            }),
            Err(e) => Err(MergeError::AbortFailed {
                detail: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::process::fake::FakeRunner;
    use crate::progress::recording::RecordingProgress;

    fn engine(runner: FakeRunner) -> (MergeEngine, Arc<FakeRunner>) {
        let runner = Arc::new(runner);
        let git = GitClient::new("/repo", runner.clone());
        (MergeEngine::new(git), runner)
    }

    fn merge_calls(runner: &FakeRunner) -> Vec<String> {
        runner
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("git merge"))
            .collect()
    }

    #[tokio::test]
    async fn test_clean_worktree_passes() {
        let (engine, _) = engine(FakeRunner::new().on("git rev-parse", 1, ""));
        engine.ensure_clean_worktree().await.unwrap();
    }

    #[tokio::test]
    async fn test_dirty_worktree_rejected() {
        let (engine, _) = engine(
            FakeRunner::new()
                .on("git rev-parse", 1, "")
                .on("git status", 0, "?? new.txt\n"),
        );
        assert!(matches!(
            engine.ensure_clean_worktree().await,
            Err(MergeError::DirtyWorktree)
        ));
    }

    #[tokio::test]
    async fn test_merge_in_progress_rejected() {
        let (engine, runner) = engine(FakeRunner::new().on("git rev-parse", 0, "abc\n"));
        assert!(matches!(
            engine.ensure_clean_worktree().await,
            Err(MergeError::MergeInProgress)
        ));
        assert!(!runner.calls().iter().any(|c| c.starts_with("git status")));
    }

    #[tokio::test]
    async fn test_both_stops_at_first_success() {
        let (engine, runner) = engine(FakeRunner::new());
        let progress = RecordingProgress::default();
        let run = engine
            .attempt_strategies("origin/main", MergeStrategy::Both, &progress)
            .await
            .unwrap();
        assert_eq!(run.succeeded, Some(MergeStrategy::Ours));
        assert_eq!(
            merge_calls(&runner),
            vec!["git merge --no-commit -X ours origin/main"]
        );
    }

    #[tokio::test]
    async fn test_both_falls_back_to_theirs() {
        let (engine, runner) = engine(
            FakeRunner::new()
                .on("git merge --no-commit -X ours", 1, "")
                .on("git --no-pager diff", 0, "ours conflict\n"),
        );
        let progress = RecordingProgress::default();
        let run = engine
            .attempt_strategies("origin/main", MergeStrategy::Both, &progress)
            .await
            .unwrap();

        assert_eq!(run.succeeded, Some(MergeStrategy::Theirs));
        assert_eq!(
            merge_calls(&runner),
            vec![
                "git merge --no-commit -X ours origin/main",
                "git merge --abort",
                "git merge --no-commit -X theirs origin/main",
            ]
        );
        assert_eq!(run.attempts.len(), 2);
        assert_eq!(run.attempts[0].diff(), Some("ours conflict"));
        assert!(progress.contains("Merge with strategy 'ours' failed (exit code 1)."));
    }

    #[tokio::test]
    async fn test_all_strategies_fail_combines_diffs() {
        let (engine, _) = engine(
            FakeRunner::new()
                .on("git merge --no-commit", 1, "")
                .on("git diff --name-only", 0, "a.txt\n")
                .on("git --no-pager diff", 0, "conflict in a.txt\n"),
        );
        let progress = RecordingProgress::default();
        let run = engine
            .attempt_strategies("main", MergeStrategy::Both, &progress)
            .await
            .unwrap();

        assert_eq!(run.succeeded, None);
        let conflicts = run.conflicts();
        assert_eq!(conflicts.files, vec!["a.txt"]);
        assert_eq!(conflicts.diff, "conflict in a.txt\n\nconflict in a.txt");
    }

    #[tokio::test]
    async fn test_abort_failure_is_fatal() {
        let (engine, runner) = engine(
            FakeRunner::new()
                .on("git merge --no-commit", 1, "")
                .on("git merge --abort", 128, ""),
        );
        let progress = RecordingProgress::default();
        let err = engine
            .attempt_strategies("main", MergeStrategy::Both, &progress)
            .await
            .unwrap_err();

        assert!(matches!(err, MergeError::AbortFailed { .. }));
        // theirs never runs after an abort failure
        assert!(!runner.calls().iter().any(|c| c.contains("-X theirs")));
    }

    #[tokio::test]
    async fn test_attempt_merge_single_strategy() {
        let (engine, runner) = engine(FakeRunner::new());
        let result = engine
            .attempt_merge("main", MergeStrategy::Theirs, &RecordingProgress::default())
            .await
            .unwrap();
        assert!(result.succeeded);
        assert_eq!(result.strategy, MergeStrategy::Theirs);
        assert_eq!(merge_calls(&runner), vec!["git merge --no-commit -X theirs main"]);
    }

    #[tokio::test]
    async fn test_attempt_merge_both_reports_winner() {
        let (engine, _) = engine(FakeRunner::new().on("git merge --no-commit -X ours", 1, ""));
        let result = engine
            .attempt_merge("main", MergeStrategy::Both, &RecordingProgress::default())
            .await
            .unwrap();
        assert!(result.succeeded);
        assert_eq!(result.strategy, MergeStrategy::Theirs);
        assert_eq!(result.conflict, None);
    }
}
