//! Codex task pages to CI failure reports.
//!
//! A task page links to the pull request Codex opened. The report lists
//! every failed check run on the PR head commit with its job log, redacted,
//! and summarised when it is too large to paste.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex_lite::Regex;
use reqwest::header::{HeaderValue, COOKIE};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Settings;
use crate::errors::CodexError;
use crate::git::github::CheckRun;
use crate::git::remote_url::parse_pull_request_url;
use crate::git::GitHubClient;
use crate::llm::LlmClient;
use crate::progress::Progress;
use crate::secrets::redact;

const PR_URL_PATTERN: &str = r#"https://github\.com/[^/\s"'<>]+/[^/\s"'<>]+/pull/\d+"#;

/// First GitHub pull request URL in `html`, without query, fragment or
/// trailing path.
pub fn extract_pr_url(html: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| match Regex::new(PR_URL_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                error!(error = %e, "invalid pull request URL pattern");
                None
            }
        })
        .as_ref()?;
    pattern.find(html).map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCheck {
    pub name: String,
    /// Redacted log, or its summary when the log was over the size limit.
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodexReport {
    pub task_url: String,
    pub pr_url: String,
    pub failed_checks: Vec<FailedCheck>,
}

impl CodexReport {
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "### Codex task\n{}\n\n**PR:** {}\n",
            self.task_url, self.pr_url
        );
        if self.failed_checks.is_empty() {
            out.push_str("\nNo failing checks 🎉\n");
            return out;
        }
        for check in &self.failed_checks {
            let _ = write!(
                out,
                "\n#### Failed check: {}\n```text\n{}\n```\n",
                check.name,
                check.log.trim_end()
            );
        }
        out
    }
}

pub struct CodexTaskProcessor {
    http: reqwest::Client,
    cookie: Option<HeaderValue>,
    github: GitHubClient,
    llm: LlmClient,
    log_size_threshold: usize,
}

impl CodexTaskProcessor {
    pub fn new(settings: &Settings) -> Result<Self, CodexError> {
        let http = reqwest::Client::builder()
            .timeout(settings.http_timeout())
            .build()?;
        let cookie = settings
            .codex
            .cookie
            .as_deref()
            .and_then(|c| match HeaderValue::from_str(c) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(env = %settings.codex.cookie_env, "cookie is not a valid header value, ignoring");
                    None
                }
            });
        Ok(Self {
            http,
            cookie,
            github: GitHubClient::from_settings(settings)?,
            llm: LlmClient::from_settings(settings)?,
            log_size_threshold: settings.limits.log_size_threshold,
        })
    }

    /// Build the failure report for the task at `url`.
    #[instrument(skip(self, progress))]
    pub async fn process(&self, url: &str, progress: &dyn Progress) -> Result<CodexReport, CodexError> {
        progress.info(&format!("Parsing Codex task page: {}…", url));
        let html = self.fetch_page(url).await?;

        let pr_url =
            extract_pr_url(&html).ok_or_else(|| CodexError::PrLinkNotFound(url.to_string()))?;
        let (repo, number) = parse_pull_request_url(&pr_url)
            .ok_or_else(|| CodexError::PrLinkNotFound(url.to_string()))?;
        info!(%repo, number, "found pull request");

        let pr = self.github.get_pull_request(&repo, number).await?;
        let runs = self.github.list_check_runs(&repo, &pr.head.sha).await?;
        let failed: Vec<&CheckRun> = runs.iter().filter(|r| r.is_failed()).collect();
        debug!(total = runs.len(), failed = failed.len(), "check runs");

        let mut failed_checks = Vec::with_capacity(failed.len());
        for run in failed {
            progress.info(&format!("Downloading log for failed check '{}'…", run.name));
            let log = match self.github.download_job_log(&repo, run.id).await {
                Ok(log) => self.prepare_log(&log).await,
                Err(e) => {
                    warn!(check = %run.name, error = %e, "log download failed");
                    progress.warn(&format!("Could not download log for '{}': {}", run.name, e));
                    format!("(log unavailable: {})", e)
                }
            };
            failed_checks.push(FailedCheck {
                name: run.name.clone(),
                log,
            });
        }

        Ok(CodexReport {
            task_url: url.to_string(),
            pr_url,
            failed_checks,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, CodexError> {
        let mut req = self.http.get(url);
        if let Some(ref cookie) = self.cookie {
            req = req.header(COOKIE, cookie.clone());
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CodexError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }

    /// Redact, then summarise when still over the size threshold.
    async fn prepare_log(&self, log: &str) -> String {
        let redacted = redact(log);
        if redacted.len() <= self.log_size_threshold {
            return redacted;
        }
        debug!(bytes = redacted.len(), threshold = self.log_size_threshold, "summarising log");
        self.llm.summarise_log(&redacted).await
    }
}
