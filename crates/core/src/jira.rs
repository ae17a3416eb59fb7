//! Jira issue summaries.

use std::path::Path;

use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::Settings;
use crate::errors::JiraError;
use crate::llm::LlmClient;
use crate::secrets::redact;

/// `summary`, a blank line, then `description` from the issue's `fields`.
/// Missing or non-string fields are treated as empty.
pub fn issue_text(issue: &Value) -> String {
    let field = |name: &str| {
        issue
            .get("fields")
            .and_then(|fields| fields.get(name))
            .and_then(Value::as_str)
            .unwrap_or("")
    };
    format!("{}\n\n{}", field("summary"), field("description"))
}

pub struct JiraSummariser {
    http: reqwest::Client,
    llm: LlmClient,
}

impl JiraSummariser {
    pub fn new(settings: &Settings) -> Result<Self, JiraError> {
        let http = reqwest::Client::builder()
            .timeout(settings.http_timeout())
            .build()?;
        Ok(Self {
            http,
            llm: LlmClient::from_settings(settings)?,
        })
    }

    /// Issue JSON from a local file when `source` names one, otherwise
    /// from an HTTP GET of `source`.
    #[instrument(skip(self))]
    pub async fn load_issue(&self, source: &str) -> Result<Value, JiraError> {
        let path = Path::new(source);
        let body = if path.exists() {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| JiraError::Read {
                    path: source.to_string(),
                    source: e,
                })?
        } else {
            let resp = self
                .http
                .get(source)
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(JiraError::Status {
                    url: source.to_string(),
                    status: status.as_u16(),
                });
            }
            resp.text().await?
        };
        debug!(bytes = body.len(), "loaded issue");
        serde_json::from_str(&body).map_err(|e| JiraError::InvalidJson {
            source_name: source.to_string(),
            detail: e.to_string(),
        })
    }

    /// Summary of the issue's title and description, redacted before it
    /// reaches the provider. Without a provider this is a truncated snippet.
    pub async fn summarise(&self, source: &str) -> Result<String, JiraError> {
        let issue = self.load_issue(source).await?;
        let text = redact(&issue_text(&issue));
        Ok(self.llm.summarise_log(&text).await)
    }
}
