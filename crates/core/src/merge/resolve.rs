//! The `merge-resolve` workflow.
//!
//! `clean check -> [PR fetch] -> merge attempts -> success | failure`, with
//! validation and upstream reporting as optional tail steps. Only the clean
//! check, PR fetch/checkout and a failed abort are fatal; everything after
//! the merge attempts degrades to warnings.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::engine::MergeEngine;
use super::report::{StatusMessage, StatusReporter};
use crate::checks::CheckRunner;
use crate::config::Settings;
use crate::errors::{CoreError, MergeError};
use crate::git::client::pr_branch_name;
use crate::git::remote_url::{parse_pr_identifier, parse_remote_slug};
use crate::git::{GitClient, GitHubClient, RepoSlug};
use crate::llm::LlmClient;
use crate::models::{BestEffort, ConflictDetails, MergeStrategy};
use crate::process::ProcessRunner;
use crate::progress::Progress;

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Explicit base ref; wins over the PR's base branch and the default.
    pub base: Option<String>,
    pub strategy: MergeStrategy,
    pub run_checks: bool,
    /// PR number or pull request URL.
    pub pr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// A strategy merged cleanly; `checks` is the validation exit code when
    /// validation ran.
    Merged {
        strategy: MergeStrategy,
        checks: Option<i32>,
    },
    /// Every strategy failed.
    Unresolved {
        base: String,
        conflicts: ConflictDetails,
        patch: Option<String>,
    },
}

impl ResolveOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Merged { checks, .. } => checks.unwrap_or(0),
            Self::Unresolved { .. } => 1,
        }
    }
}

/// Pull request being resolved, when `--pr` was given.
struct PrContext {
    repo: RepoSlug,
    number: u64,
}

pub struct MergeResolver {
    git: GitClient,
    engine: MergeEngine,
    github: GitHubClient,
    llm: LlmClient,
    checks: CheckRunner,
    reporter: StatusReporter,
    default_base: String,
}

impl MergeResolver {
    pub fn new(
        repo: impl Into<PathBuf>,
        settings: &Settings,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self, CoreError> {
        let repo = repo.into();
        let git = GitClient::new(&repo, Arc::clone(&runner));
        let github = GitHubClient::from_settings(settings)?;
        Ok(Self {
            engine: MergeEngine::new(git.clone()),
            git,
            reporter: StatusReporter::new(github.clone()),
            github,
            llm: LlmClient::from_settings(settings)?,
            checks: CheckRunner::new(&repo, runner, &settings.checks),
            default_base: settings.merge.default_base.clone(),
        })
    }

    #[instrument(skip(self, progress), fields(repo = %self.git.repo_path().display()))]
    pub async fn resolve(
        &self,
        options: &ResolveOptions,
        progress: &dyn Progress,
    ) -> Result<ResolveOutcome, MergeError> {
        self.engine.ensure_clean_worktree().await?;

        let mut discovered_base = None;
        let pr = match options.pr {
            Some(ref value) => {
                let (ctx, base) = self.checkout_pull_request(value, progress).await?;
                discovered_base = base;
                Some(ctx)
            }
            None => None,
        };

        let base = options
            .base
            .clone()
            .or(discovered_base)
            .unwrap_or_else(|| self.default_base.clone());
        info!(%base, strategy = %options.strategy, "starting merge attempts");

        let run = self
            .engine
            .attempt_strategies(&base, options.strategy, progress)
            .await?;

        match run.succeeded {
            Some(strategy) => Ok(self.on_success(strategy, options, pr.as_ref(), progress).await),
            None => Ok(self.on_failure(base, run.conflicts(), pr.as_ref(), progress).await),
        }
    }

    /// Fetch `pull/<n>/head` into `pr-<n>` and check it out. Returns the PR
    /// context and, when the metadata lookup worked, `origin/<base ref>`.
    async fn checkout_pull_request(
        &self,
        value: &str,
        progress: &dyn Progress,
    ) -> Result<(PrContext, Option<String>), MergeError> {
        let id = parse_pr_identifier(value)?;
        let repo = match id.repo {
            Some(repo) => repo,
            None => parse_remote_slug(&self.git.remote_url("origin").await?)?,
        };

        let base = match self.github.get_pull_request(&repo, id.number).await {
            Ok(pr) => {
                let base = format!("origin/{}", pr.base.ref_name);
                progress.info(&format!("Using base branch '{}' from PR metadata.", base));
                Some(base)
            }
            Err(e) => {
                warn!(%repo, number = id.number, error = %e, "PR metadata lookup failed");
                progress.warn(&format!("Failed to fetch PR metadata: {}", e));
                None
            }
        };

        let code = self.git.fetch_pull_request(id.number).await?;
        if code != 0 {
            return Err(MergeError::FetchFailed {
                number: id.number,
                exit_code: code,
            });
        }
        let branch = pr_branch_name(id.number);
        let code = self.git.checkout(&branch).await?;
        if code != 0 {
            return Err(MergeError::CheckoutFailed {
                branch,
                exit_code: code,
            });
        }
        progress.info(&format!("Checked out PR #{} into '{}'.", id.number, branch));

        Ok((
            PrContext {
                repo,
                number: id.number,
            },
            base,
        ))
    }

    async fn on_success(
        &self,
        strategy: MergeStrategy,
        options: &ResolveOptions,
        pr: Option<&PrContext>,
        progress: &dyn Progress,
    ) -> ResolveOutcome {
        progress.info(&format!("Merge completed using strategy '{}'.", strategy));
        progress.info("Review the changes, resolve any remaining issues and commit when ready.");

        if !options.run_checks {
            progress.info("Run `f2clipboard merge-checks` to validate the merge when convenient.");
            self.report(pr, StatusMessage::ChecksSkipped { strategy }, progress)
                .await;
            return ResolveOutcome::Merged {
                strategy,
                checks: None,
            };
        }

        let code = match self.checks.run_checks(None, progress).await {
            Ok(code) => code,
            Err(e) => {
                progress.error(&e.to_string());
                1
            }
        };
        let message = if code == 0 {
            StatusMessage::ChecksPassed { strategy }
        } else {
            StatusMessage::ChecksFailed {
                strategy,
                exit_code: code,
            }
        };
        self.report(pr, message, progress).await;
        ResolveOutcome::Merged {
            strategy,
            checks: Some(code),
        }
    }

    async fn on_failure(
        &self,
        base: String,
        conflicts: ConflictDetails,
        pr: Option<&PrContext>,
        progress: &dyn Progress,
    ) -> ResolveOutcome {
        progress.error("Automatic merge strategies failed. Manual intervention required.");

        let patch = match self.llm.suggest_patch(&conflicts.diff).await {
            BestEffort::Done(patch) => Some(patch),
            BestEffort::Skipped(reason) => {
                debug!(%reason, "patch suggestion skipped");
                progress.info(&reason);
                None
            }
            BestEffort::Failed(reason) => {
                debug!(%reason, "patch suggestion failed");
                progress.warn("Failed to generate a patch suggestion automatically.");
                None
            }
        };

        self.report(pr, StatusMessage::Unresolved, progress).await;
        ResolveOutcome::Unresolved {
            base,
            conflicts,
            patch,
        }
    }

    async fn report(&self, pr: Option<&PrContext>, message: StatusMessage, progress: &dyn Progress) {
        let Some(pr) = pr else {
            return;
        };
        match self
            .reporter
            .post_status(&pr.repo, pr.number, message)
            .await
        {
            BestEffort::Done(()) => progress.info("Posted merge summary comment to the PR."),
            BestEffort::Skipped(reason) => {
                debug!(%reason, "status comment skipped");
                progress.warn(&reason);
            }
            BestEffort::Failed(reason) => progress.warn(&reason),
        }
    }
}
