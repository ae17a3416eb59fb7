//! Chat-completion helpers for OpenAI and Anthropic.
//!
//! Exactly one provider serves each request: OpenAI when its key is
//! configured, otherwise Anthropic. Callers of [`LlmClient::suggest_patch`]
//! and [`LlmClient::summarise_log`] never see an error; failures degrade to
//! a [`BestEffort`] outcome or to a truncated snippet.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::config::{LlmSettings, Settings};
use crate::errors::LlmError;
use crate::models::BestEffort;

const PATCH_SYSTEM_PROMPT: &str = "You resolve git merge conflicts. Reply with a single unified diff \
that applies cleanly with `git apply` to the working tree described by the user. \
Do not include explanations.";
const PATCH_MAX_TOKENS: u32 = 1024;

const SUMMARY_SYSTEM_PROMPT: &str = "Summarise the following CI log.";
const SUMMARY_MAX_TOKENS: u32 = 200;
const SNIPPET_CHARS: usize = 100;

/// Shown when a patch suggestion is skipped for lack of a provider key.
pub const CREDENTIALS_HINT: &str =
    "Configure OPENAI_API_KEY or ANTHROPIC_API_KEY to enable automatic patch suggestions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "OpenAI"),
            Self::Anthropic => write!(f, "Anthropic"),
        }
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    provider: Provider,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

/// Client for whichever provider is configured.
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: Option<Endpoint>,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = select_endpoint(settings);
        match endpoint {
            Some(ref e) => debug!(provider = %e.provider, model = %e.model, "LLM provider selected"),
            None => debug!("no LLM provider configured"),
        }
        Ok(Self { http, endpoint })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        Self::new(&settings.llm, settings.http_timeout())
    }

    pub fn has_credentials(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn provider(&self) -> Option<Provider> {
        self.endpoint.as_ref().map(|e| e.provider)
    }

    /// One system + user exchange with the selected provider.
    #[instrument(skip(self, system, user), fields(provider = ?self.provider()))]
    pub async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String, LlmError> {
        let endpoint = self.endpoint.as_ref().ok_or(LlmError::NoCredentials)?;
        let text = match endpoint.provider {
            Provider::OpenAi => self.complete_openai(endpoint, system, user, max_tokens).await?,
            Provider::Anthropic => {
                self.complete_anthropic(endpoint, system, user, max_tokens)
                    .await?
            }
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: endpoint.provider.to_string(),
            });
        }
        Ok(text)
    }

    /// Ask for a unified diff resolving `diff`. Skipped without a provider
    /// or with a blank diff; a failed request is [`BestEffort::Failed`].
    pub async fn suggest_patch(&self, diff: &str) -> BestEffort<String> {
        if !self.has_credentials() {
            return BestEffort::Skipped(CREDENTIALS_HINT.to_string());
        }
        if diff.trim().is_empty() {
            return BestEffort::Skipped(
                "No conflict diff captured; skipping patch suggestion.".to_string(),
            );
        }
        let user = format!("Resolve the following merge conflicts:\n\n{}", diff);
        match self.complete(PATCH_SYSTEM_PROMPT, &user, PATCH_MAX_TOKENS).await {
            Ok(text) => BestEffort::Done(strip_code_fence(&text)),
            Err(e) => {
                warn!(error = %e, "patch suggestion failed");
                BestEffort::Failed(e.to_string())
            }
        }
    }

    /// Summarise a CI log, falling back to a truncated snippet.
    pub async fn summarise_log(&self, text: &str) -> String {
        if self.has_credentials() {
            match self.complete(SUMMARY_SYSTEM_PROMPT, text, SUMMARY_MAX_TOKENS).await {
                Ok(summary) => return summary,
                Err(e) => warn!(error = %e, "log summary failed, truncating instead"),
            }
        }
        truncate_snippet(text)
    }

    async fn complete_openai(
        &self,
        endpoint: &Endpoint,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", endpoint.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&endpoint.api_key)
            .json(&json!({
                "model": endpoint.model,
                "temperature": 0,
                "max_tokens": max_tokens,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user}
                ]
            }))
            .send()
            .await?;
        let resp = check_status(endpoint.provider, resp).await?;
        let parsed: OpenAiResponse = resp.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn complete_anthropic(
        &self,
        endpoint: &Endpoint,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/messages", endpoint.base_url.trim_end_matches('/'));
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&endpoint.api_key).map_err(|_| LlmError::InvalidHeader {
                provider: endpoint.provider.to_string(),
            })?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));

        let resp = self
            .http
            .post(&url)
            .headers(headers)
            .json(&json!({
                "model": endpoint.model,
                "system": system,
                "temperature": 0,
                "max_tokens": max_tokens,
                "messages": [
                    {"role": "user", "content": user}
                ]
            }))
            .send()
            .await?;
        let resp = check_status(endpoint.provider, resp).await?;
        let parsed: AnthropicResponse = resp.json().await?;
        Ok(parsed
            .content
            .into_iter()
            .next()
            .and_then(|b| b.text)
            .unwrap_or_default())
    }
}

fn select_endpoint(settings: &LlmSettings) -> Option<Endpoint> {
    if let Some(ref key) = settings.openai_api_key {
        return Some(Endpoint {
            provider: Provider::OpenAi,
            base_url: settings.openai_base_url.clone(),
            api_key: key.clone(),
            model: settings.openai_model.clone(),
        });
    }
    settings.anthropic_api_key.as_ref().map(|key| Endpoint {
        provider: Provider::Anthropic,
        base_url: settings.anthropic_base_url.clone(),
        api_key: key.clone(),
        model: settings.anthropic_model.clone(),
    })
}

async fn check_status(provider: Provider, resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Api {
        provider: provider.to_string(),
        status: status.as_u16(),
        body: body.chars().take(300).collect(),
    })
}

/// First 100 characters of `text` followed by an ellipsis line.
pub fn truncate_snippet(text: &str) -> String {
    let head: String = text.chars().take(SNIPPET_CHARS).collect();
    format!("{}\n…\n", head)
}

/// Drop a surrounding Markdown code fence, if the model added one.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => return trimmed.to_string(),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim_end().to_string()
}
