//! TOML-based configuration for f2clipboard.
//!
//! Secrets (API keys, tokens, cookies) are never written to the file. The
//! file holds `_env` fields naming environment variables, and the values are
//! resolved at runtime via [`Settings::resolve_env_vars`]. Every section is
//! optional, so running without any config file yields the built-in
//! defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level settings loaded from an optional TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub github: GitHubSettings,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub codex: CodexSettings,

    #[serde(default)]
    pub limits: LimitSettings,

    #[serde(default)]
    pub merge: MergeSettings,

    #[serde(default)]
    pub checks: ChecksSettings,
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSettings {
    /// GitHub API base URL (default `https://api.github.com`).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Environment variable holding the GitHub token.
    #[serde(default = "default_github_token_env")]
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token_env: default_github_token_env(),
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LLM providers
// ---------------------------------------------------------------------------

/// OpenAI and Anthropic provider settings. OpenAI takes precedence when both
/// keys resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_openai_key_env")]
    pub openai_api_key_env: String,

    /// Model name; the `OPENAI_MODEL` environment variable overrides it.
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_anthropic_key_env")]
    pub anthropic_api_key_env: String,

    /// Model name; the `ANTHROPIC_MODEL` environment variable overrides it.
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    #[serde(skip)]
    pub openai_api_key: Option<String>,

    #[serde(skip)]
    pub anthropic_api_key: Option<String>,
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".into()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".into()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            openai_api_key_env: default_openai_key_env(),
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            anthropic_api_key_env: default_anthropic_key_env(),
            anthropic_model: default_anthropic_model(),
            anthropic_base_url: default_anthropic_base_url(),
            openai_api_key: None,
            anthropic_api_key: None,
        }
    }
}

impl LlmSettings {
    /// True when at least one provider key resolved.
    pub fn has_credentials(&self) -> bool {
        self.openai_api_key.is_some() || self.anthropic_api_key.is_some()
    }
}

// ---------------------------------------------------------------------------
// Codex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodexSettings {
    /// Environment variable holding the session cookie sent to task pages.
    #[serde(default = "default_codex_cookie_env")]
    pub cookie_env: String,

    #[serde(skip)]
    pub cookie: Option<String>,
}

fn default_codex_cookie_env() -> String {
    "CODEX_COOKIE".into()
}

impl Default for CodexSettings {
    fn default() -> Self {
        Self {
            cookie_env: default_codex_cookie_env(),
            cookie: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    /// Logs larger than this many bytes are summarised (env `LOG_SIZE_THRESHOLD`).
    #[serde(default = "default_log_size_threshold")]
    pub log_size_threshold: usize,

    /// Timeout applied to every outbound HTTP request (env `HTTP_TIMEOUT`).
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: f64,
}

fn default_log_size_threshold() -> usize {
    150_000
}
fn default_http_timeout() -> f64 {
    10.0
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            log_size_threshold: default_log_size_threshold(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge & checks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Base ref used when neither `--base` nor PR metadata supplies one.
    #[serde(default = "default_base")]
    pub default_base: String,
}

fn default_base() -> String {
    "origin/main".into()
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            default_base: default_base(),
        }
    }
}

/// Commands run by the validation runner. The static check receives the
/// target files as trailing arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksSettings {
    #[serde(default = "default_static_check")]
    pub static_check: Vec<String>,

    #[serde(default = "default_test_command")]
    pub test_command: Vec<String>,
}

fn default_static_check() -> Vec<String> {
    vec!["pre-commit".into(), "run".into(), "--files".into()]
}
fn default_test_command() -> Vec<String> {
    vec!["pytest".into(), "-q".into()]
}

impl Default for ChecksSettings {
    fn default() -> Self {
        Self {
            static_check: default_static_check(),
            test_command: default_test_command(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl Settings {
    /// Default config location: `<config dir>/f2clipboard/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("f2clipboard").join("config.toml"))
    }

    /// Load a [`Settings`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(settings)
    }

    /// Load, resolve and validate.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and the built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => Self::load_from_file(default)?,
                None => {
                    debug!("no configuration file, using defaults");
                    Self::default()
                }
            },
        };
        settings.resolve_env_vars()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve all `*_env` fields and the numeric / model overrides from the
    /// process environment.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Same as [`resolve_env_vars`](Self::resolve_env_vars) with an injectable
    /// lookup. Missing or empty variables resolve to `None`.
    pub fn resolve_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str, field: &str| resolve_optional(&lookup, name, field);

        self.github.token = get(&self.github.token_env, "github.token_env");
        self.llm.openai_api_key = get(&self.llm.openai_api_key_env, "llm.openai_api_key_env");
        self.llm.anthropic_api_key =
            get(&self.llm.anthropic_api_key_env, "llm.anthropic_api_key_env");
        self.codex.cookie = get(&self.codex.cookie_env, "codex.cookie_env");

        if let Some(model) = get("OPENAI_MODEL", "llm.openai_model") {
            self.llm.openai_model = model;
        }
        if let Some(model) = get("ANTHROPIC_MODEL", "llm.anthropic_model") {
            self.llm.anthropic_model = model;
        }
        if let Some(raw) = get("LOG_SIZE_THRESHOLD", "limits.log_size_threshold") {
            self.limits.log_size_threshold =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "LOG_SIZE_THRESHOLD".into(),
                    detail: format!("expected a byte count, got '{}'", raw),
                })?;
        }
        if let Some(raw) = get("HTTP_TIMEOUT", "limits.http_timeout_secs") {
            self.limits.http_timeout_secs =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "HTTP_TIMEOUT".into(),
                    detail: format!("expected seconds, got '{}'", raw),
                })?;
        }

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all values are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = self.limits.http_timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.http_timeout_secs".into(),
                detail: "timeout must be greater than 0".into(),
            });
        }
        for (field, value) in [
            ("github.api_url", &self.github.api_url),
            ("llm.openai_base_url", &self.llm.openai_base_url),
            ("llm.anthropic_base_url", &self.llm.anthropic_base_url),
            ("merge.default_base", &self.merge.default_base),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must not be empty".into(),
                });
            }
        }
        if self.checks.static_check.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "checks.static_check".into(),
                detail: "command must not be empty".into(),
            });
        }
        if self.checks.test_command.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "checks.test_command".into(),
                detail: "command must not be empty".into(),
            });
        }
        Ok(())
    }

    /// HTTP timeout as a [`Duration`].
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.limits.http_timeout_secs)
    }
}

fn resolve_optional<F>(lookup: &F, env_name: &str, field: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(env_name) {
        Some(val) if !val.trim().is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val.trim().to_string())
        }
        Some(_) => {
            debug!(field, env_name, "env var is set but empty");
            None
        }
        None => {
            debug!(field, env_name, "env var not set");
            None
        }
    }
}
