//! GitHub REST API client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::remote_url::RepoSlug;
use crate::config::Settings;
use crate::errors::GitHubError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub html_url: String,
}

/// A check run attached to a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRun {
    /// For GitHub Actions this is also the job ID.
    pub id: u64,
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub html_url: Option<String>,
}

impl CheckRun {
    /// Completed with a failing conclusion.
    pub fn is_failed(&self) -> bool {
        matches!(
            self.conclusion.as_deref(),
            Some("failure") | Some("timed_out") | Some("startup_failure")
        )
    }
}

#[derive(Debug, Deserialize)]
struct CheckRunList {
    check_runs: Vec<CheckRun>,
}

/// Asynchronous GitHub REST API client. Reads work anonymously; writes
/// require a token.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(
        api_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("f2clipboard/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        debug!(api_url = %api_url, authenticated = token.is_some(), "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, GitHubError> {
        Self::new(
            settings.github.api_url.clone(),
            settings.github.token.clone(),
            settings.http_timeout(),
        )
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Get a single pull request by number.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn get_pull_request(
        &self,
        repo: &RepoSlug,
        pr_number: u64,
    ) -> Result<PullRequest, GitHubError> {
        let url = format!("{}/repos/{}/pulls/{}", self.api_url, repo, pr_number);
        let resp = self.authorized(self.http.get(&url)).send().await?;
        let resp = check_response(resp).await?;
        let pr: PullRequest = resp.json().await?;
        debug!(number = pr.number, base = %pr.base.ref_name, "fetched pull request");
        Ok(pr)
    }

    /// Post a comment on a pull request (issues endpoint).
    #[instrument(skip(self, body), fields(repo = %repo))]
    pub async fn create_issue_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, GitHubError> {
        if self.token.is_none() {
            return Err(GitHubError::MissingToken);
        }
        let url = format!("{}/repos/{}/issues/{}/comments", self.api_url, repo, number);
        let payload = serde_json::json!({ "body": body });
        let resp = self
            .authorized(self.http.post(&url))
            .json(&payload)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let comment: IssueComment = resp.json().await?;
        info!(number, comment_id = comment.id, "posted issue comment");
        Ok(comment)
    }

    /// List check runs for a commit.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn list_check_runs(
        &self,
        repo: &RepoSlug,
        sha: &str,
    ) -> Result<Vec<CheckRun>, GitHubError> {
        let url = format!("{}/repos/{}/commits/{}/check-runs", self.api_url, repo, sha);
        let resp = self
            .authorized(self.http.get(&url))
            .query(&[("per_page", "100")])
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let list: CheckRunList = resp.json().await?;
        debug!(count = list.check_runs.len(), "fetched check runs");
        Ok(list.check_runs)
    }

    /// Download the plain-text log of an Actions job. GitHub answers with a
    /// redirect to blob storage, which reqwest follows.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn download_job_log(&self, repo: &RepoSlug, job_id: u64) -> Result<String, GitHubError> {
        let url = format!("{}/repos/{}/actions/jobs/{}/logs", self.api_url, repo, job_id);
        let resp = self.authorized(self.http.get(&url)).send().await?;
        let resp = check_response(resp).await?;
        let text = resp.text().await?;
        debug!(job_id, bytes = text.len(), "downloaded job log");
        Ok(text)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }
}

async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.as_u16() == 429
        || (status.as_u16() == 403
            && resp
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|v| v == "0"))
    {
        let reset = resp
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        return Err(GitHubError::RateLimited { reset_at: reset });
    }
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(GitHubError::AuthenticationFailed(format!("HTTP {}", status)));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GitHubError::ApiError {
        status: status.as_u16(),
        body: body.chars().take(300).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(url: &str, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(url, token.map(String::from), Duration::from_secs(5)).unwrap()
    }

    fn slug() -> RepoSlug {
        RepoSlug::new("acme", "widgets")
    }

    const PR_JSON: &str = r#"{
        "number": 7, "title": "Add widgets", "html_url": "https://github.com/acme/widgets/pull/7",
        "state": "open",
        "head": {"ref": "feature", "sha": "abc123"},
        "base": {"ref": "develop", "sha": "def456"}
    }"#;

    #[tokio::test]
    async fn test_get_pull_request_with_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widgets/pulls/7")
            .match_header("authorization", "Bearer tok")
            .match_header("accept", "application/vnd.github+json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PR_JSON)
            .create_async()
            .await;

        let pr = client(&server.url(), Some("tok"))
            .get_pull_request(&slug(), 7)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(pr.base.ref_name, "develop");
        assert_eq!(pr.head.sha, "abc123");
    }

    #[tokio::test]
    async fn test_get_pull_request_anonymous() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widgets/pulls/7")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(PR_JSON)
            .create_async()
            .await;

        let gh = client(&server.url(), Some("   "));
        assert!(!gh.has_token());
        gh.get_pull_request(&slug(), 7).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widgets/pulls/1")
            .with_status(401)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/widgets/pulls/2")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/widgets/pulls/3")
            .with_status(429)
            .with_header("x-ratelimit-reset", "1700000000")
            .create_async()
            .await;

        let gh = client(&server.url(), Some("tok"));
        assert!(matches!(
            gh.get_pull_request(&slug(), 1).await,
            Err(GitHubError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            gh.get_pull_request(&slug(), 2).await,
            Err(GitHubError::ApiError { status: 404, ref body }) if body == "Not Found"
        ));
        assert!(matches!(
            gh.get_pull_request(&slug(), 3).await,
            Err(GitHubError::RateLimited { ref reset_at }) if reset_at == "1700000000"
        ));
    }

    #[tokio::test]
    async fn test_create_issue_comment() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/acme/widgets/issues/7/comments")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(serde_json::json!({ "body": "hello" })))
            .with_status(201)
            .with_body(r#"{"id": 99, "html_url": "https://github.com/acme/widgets/pull/7#issuecomment-99"}"#)
            .create_async()
            .await;

        let comment = client(&server.url(), Some("tok"))
            .create_issue_comment(&slug(), 7, "hello")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(comment.id, 99);
    }

    #[tokio::test]
    async fn test_create_issue_comment_requires_token() {
        let gh = client("http://127.0.0.1:9", None);
        assert!(matches!(
            gh.create_issue_comment(&slug(), 7, "hello").await,
            Err(GitHubError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_check_runs_and_logs() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widgets/commits/abc123/check-runs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"total_count": 2, "check_runs": [
                    {"id": 11, "name": "lint", "status": "completed", "conclusion": "success", "html_url": null},
                    {"id": 12, "name": "test", "status": "completed", "conclusion": "failure", "html_url": null}
                ]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/widgets/actions/jobs/12/logs")
            .with_status(200)
            .with_body("line 1\nline 2\n")
            .create_async()
            .await;

        let gh = client(&server.url(), None);
        let runs = gh.list_check_runs(&slug(), "abc123").await.unwrap();
        let failed: Vec<_> = runs.iter().filter(|r| r.is_failed()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "test");

        let log = gh.download_job_log(&slug(), failed[0].id).await.unwrap();
        assert_eq!(log, "line 1\nline 2\n");
    }
}
