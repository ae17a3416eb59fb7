//! End-to-end tests for the merge-resolve workflow against real repositories.
//!
//! Every test builds a throwaway repository with two diverged branches:
//! `main` (the base) and `feature` (checked out). No network I/O.
//!
//! Tests skip gracefully if `git` is not installed.

use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use f2clipboard_core::config::Settings;
use f2clipboard_core::errors::MergeError;
use f2clipboard_core::git::GitClient;
use f2clipboard_core::merge::{MergeEngine, MergeResolver, ResolveOptions, ResolveOutcome};
use f2clipboard_core::models::MergeStrategy;
use f2clipboard_core::process::SystemRunner;
use f2clipboard_core::progress::{NoProgress, Progress};

// ===========================================================================
// Helpers
// ===========================================================================

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
}

/// `main` and `feature` both change `file.txt`. With `delete_on_main` the
/// base deletes it instead, which no `-X` option can resolve.
fn diverged_repo(delete_on_main: bool) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);

    std::fs::write(dir.join("file.txt"), "original\n").unwrap();
    std::fs::write(dir.join("other.txt"), "untouched\n").unwrap();
    commit_all(dir, "initial");

    git(dir, &["checkout", "-q", "-b", "feature"]);
    std::fs::write(dir.join("file.txt"), "feature\n").unwrap();
    commit_all(dir, "feature change");

    git(dir, &["checkout", "-q", "main"]);
    if delete_on_main {
        std::fs::remove_file(dir.join("file.txt")).unwrap();
    } else {
        std::fs::write(dir.join("file.txt"), "main\n").unwrap();
    }
    commit_all(dir, "main change");

    git(dir, &["checkout", "-q", "feature"]);
    tmp
}

fn engine(dir: &Path) -> MergeEngine {
    MergeEngine::new(GitClient::new(dir, Arc::new(SystemRunner)))
}

fn resolver(dir: &Path) -> MergeResolver {
    let mut settings = Settings::default();
    settings.github.token = None;
    settings.llm.openai_api_key = None;
    settings.llm.anthropic_api_key = None;
    MergeResolver::new(dir, &settings, Arc::new(SystemRunner)).unwrap()
}

fn options(strategy: MergeStrategy) -> ResolveOptions {
    ResolveOptions {
        base: Some("main".into()),
        strategy,
        run_checks: false,
        pr: None,
    }
}

#[derive(Default)]
struct Collected(Mutex<Vec<String>>);

impl Collected {
    fn contains(&self, needle: &str) -> bool {
        self.0.lock().unwrap().iter().any(|l| l.contains(needle))
    }
}

impl Progress for Collected {
    fn info(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
    fn warn(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
    fn error(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

// ===========================================================================
// Strategies
// ===========================================================================

#[tokio::test]
async fn test_ours_keeps_current_branch_version() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let repo = diverged_repo(false);

    let result = engine(repo.path())
        .attempt_merge("main", MergeStrategy::Ours, &NoProgress)
        .await
        .unwrap();

    assert!(result.succeeded);
    let content = std::fs::read_to_string(repo.path().join("file.txt")).unwrap();
    assert_eq!(content, "feature\n");
}

#[tokio::test]
async fn test_theirs_takes_base_version() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let repo = diverged_repo(false);

    let outcome = resolver(repo.path())
        .resolve(&options(MergeStrategy::Theirs), &NoProgress)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ResolveOutcome::Merged {
            strategy: MergeStrategy::Theirs,
            checks: None
        }
    );
    let content = std::fs::read_to_string(repo.path().join("file.txt")).unwrap();
    assert_eq!(content, "main\n");
}

// ===========================================================================
// Failures
// ===========================================================================

#[tokio::test]
async fn test_dirty_tree_is_rejected_before_merging() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let repo = diverged_repo(false);
    std::fs::write(repo.path().join("stray.txt"), "untracked\n").unwrap();

    let err = resolver(repo.path())
        .resolve(&options(MergeStrategy::Ours), &NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, MergeError::DirtyWorktree));
    assert!(err.to_string().contains("uncommitted changes"));
    assert!(!repo.path().join(".git/MERGE_HEAD").exists());
    let content = std::fs::read_to_string(repo.path().join("file.txt")).unwrap();
    assert_eq!(content, "feature\n");
}

#[tokio::test]
async fn test_failed_attempt_restores_clean_tree() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let repo = diverged_repo(true);

    let run = engine(repo.path())
        .attempt_strategies("main", MergeStrategy::Both, &NoProgress)
        .await
        .unwrap();

    assert_eq!(run.succeeded, None);
    assert_eq!(run.attempts.len(), 2);
    assert_eq!(run.attempts[0].strategy, MergeStrategy::Ours);
    assert_eq!(run.attempts[1].strategy, MergeStrategy::Theirs);
    assert!(run.conflicts().files.contains(&"file.txt".to_string()));

    let status = git(repo.path(), &["status", "--porcelain"]);
    assert!(status.trim().is_empty(), "tree not clean: {}", status);
}

#[tokio::test]
async fn test_unresolved_without_credentials_exits_one() {
    if !git_available() {
        eprintln!("Skipping: git not available");
        return;
    }
    let repo = diverged_repo(true);
    let progress = Collected::default();

    let outcome = resolver(repo.path())
        .resolve(&options(MergeStrategy::Both), &progress)
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(outcome, ResolveOutcome::Unresolved { patch: None, .. }));
    assert!(progress.contains("Configure OPENAI_API_KEY or ANTHROPIC_API_KEY"));
    assert!(progress.contains("Automatic merge strategies failed"));
}
