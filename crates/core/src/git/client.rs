//! Local Git repository operations via the `git` CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::errors::GitError;
use crate::process::{Invocation, ProcessOutput, ProcessRunner};

/// Prefix of the local branch a pull request head is fetched into.
pub const PR_BRANCH_PREFIX: &str = "pr-";

/// Asynchronous client running `git` inside one working tree.
#[derive(Clone)]
pub struct GitClient {
    repo_path: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl GitClient {
    pub fn new<P: AsRef<Path>>(repo_path: P, runner: Arc<dyn ProcessRunner>) -> Self {
        let repo_path = repo_path.as_ref().to_path_buf();
        debug!(path = %repo_path.display(), "created GitClient");
        Self { repo_path, runner }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    /// True when `MERGE_HEAD` resolves, i.e. a merge is in progress.
    #[instrument(skip(self))]
    pub async fn merge_in_progress(&self) -> Result<bool, GitError> {
        let output = self
            .capture(&["rev-parse", "-q", "--verify", "MERGE_HEAD"])
            .await?;
        Ok(output.success())
    }

    /// `git status --porcelain` (untracked files included).
    pub async fn status_porcelain(&self) -> Result<String, GitError> {
        self.run_git(&["status", "--porcelain"]).await
    }

    /// `git status --porcelain -z`, NUL-delimited.
    pub async fn status_porcelain_z(&self) -> Result<String, GitError> {
        self.run_git(&["status", "--porcelain", "-z"]).await
    }

    /// `git merge --no-commit -X <option> <base>`; returns the exit code.
    #[instrument(skip(self))]
    pub async fn merge_no_commit(&self, option: &str, base: &str) -> Result<i32, GitError> {
        let code = self
            .status(&["merge", "--no-commit", "-X", option, base])
            .await?;
        if code == 0 {
            info!(option, base, "merge staged without commit");
        }
        Ok(code)
    }

    /// `git merge --abort`; returns the exit code.
    #[instrument(skip(self))]
    pub async fn merge_abort(&self) -> Result<i32, GitError> {
        self.status(&["merge", "--abort"]).await
    }

    /// Paths with unmerged status.
    pub async fn unmerged_files(&self) -> Result<Vec<String>, GitError> {
        let out = self
            .run_git(&["diff", "--name-only", "--diff-filter=U"])
            .await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Diff restricted to unmerged paths.
    pub async fn unmerged_diff(&self) -> Result<String, GitError> {
        self.run_git(&["--no-pager", "diff", "--diff-filter=U"])
            .await
    }

    /// `remote.<name>.url`, trimmed.
    pub async fn remote_url(&self, remote: &str) -> Result<String, GitError> {
        let key = format!("remote.{}.url", remote);
        let url = self.run_git(&["config", "--get", &key]).await?;
        Ok(url.trim().to_string())
    }

    /// Fetch `pull/<n>/head` from origin into `pr-<n>`; returns the exit code.
    #[instrument(skip(self))]
    pub async fn fetch_pull_request(&self, number: u64) -> Result<i32, GitError> {
        let refspec = format!("pull/{}/head:{}", number, pr_branch_name(number));
        self.status(&["fetch", "--force", "origin", &refspec]).await
    }

    /// `git checkout <branch>`; returns the exit code.
    #[instrument(skip(self))]
    pub async fn checkout(&self, branch: &str) -> Result<i32, GitError> {
        self.status(&["checkout", branch]).await
    }

    fn invocation(&self, args: &[&str]) -> Invocation {
        Invocation::new("git", &self.repo_path).args(args.iter().copied())
    }

    async fn capture(&self, args: &[&str]) -> Result<ProcessOutput, GitError> {
        Ok(self.runner.output(&self.invocation(args)).await?)
    }

    async fn status(&self, args: &[&str]) -> Result<i32, GitError> {
        Ok(self.runner.status(&self.invocation(args)).await?)
    }

    /// Run and return stdout, failing on a non-zero exit.
    async fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.capture(args).await?;
        if !output.success() {
            let stderr = output.stderr.trim().to_string();
            warn!(exit_code = output.exit_code, %stderr, "git command failed");
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                exit_code: output.exit_code,
                stderr,
            });
        }
        Ok(output.stdout)
    }
}

/// Local branch name for a fetched pull request.
pub fn pr_branch_name(number: u64) -> String {
    format!("{}{}", PR_BRANCH_PREFIX, number)
}
