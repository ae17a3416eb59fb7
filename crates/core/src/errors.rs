//! Error types for the f2clipboard core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Checks(#[from] ChecksError),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Codex(#[from] CodexError),

    #[error(transparent)]
    Files(#[from] FilesError),

    #[error(transparent)]
    Jira(#[from] JiraError),
}

// ---------------------------------------------------------------------------
// Subprocess errors
// ---------------------------------------------------------------------------

/// Errors from spawning external programs.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The binary was not found on `$PATH`.
    #[error("{program} binary not found")]
    NotFound { program: String },

    /// Any other spawn / wait failure.
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub fn from_io(program: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                program: program.to_string(),
            }
        } else {
            Self::Io {
                program: program.to_string(),
                source,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local `git` CLI operations and git-related parsing.
#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A `git` command exited with a non-zero status.
    #[error("git {command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// `remote.origin.url` is set but empty.
    #[error("origin remote URL is empty")]
    EmptyRemote,

    /// The origin remote is neither an SSH nor a github.com URL.
    #[error("Unsupported origin remote URL format: {0}")]
    UnsupportedRemote(String),

    /// The remote path does not split into owner/repo.
    #[error("Could not parse origin remote into owner/repo: {0}")]
    InvalidRemote(String),

    /// `--pr` was neither a number nor a pull request URL.
    #[error("Provide a PR number or GitHub pull request URL (got '{0}')")]
    InvalidPrIdentifier(String),
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from GitHub REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, timeout).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Authentication token is missing or invalid.
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    /// A write endpoint was called without a configured token.
    #[error("GitHub token is not configured")]
    MissingToken,
}

// ---------------------------------------------------------------------------
// LLM provider errors
// ---------------------------------------------------------------------------

/// Errors from the OpenAI / Anthropic completion clients.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Neither provider has an API key.
    #[error("no LLM provider credentials configured")]
    NoCredentials,

    #[error("LLM HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("{provider} API request failed: HTTP {status} {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// The response carried no text content.
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },

    /// An API key could not be encoded as a header value.
    #[error("invalid {provider} API key header")]
    InvalidHeader { provider: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value (or its environment override) is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Merge workflow errors
// ---------------------------------------------------------------------------

/// Fatal errors of the merge-resolve workflow. Recoverable strategy failures
/// are not errors; they are reported through `AttemptResult`.
#[derive(Debug, Error)]
pub enum MergeError {
    /// `MERGE_HEAD` exists.
    #[error("A merge is already in progress. Complete or abort it before rerunning.")]
    MergeInProgress,

    /// `git status --porcelain` is not empty.
    #[error("Repository has uncommitted changes. Commit or stash them before running merge-resolve.")]
    DirtyWorktree,

    /// `git merge --abort` failed after a failed attempt.
    #[error("Failed to abort merge automatically; resolve the repository state manually ({detail}).")]
    AbortFailed { detail: String },

    /// Fetching `pull/<n>/head` from origin failed.
    #[error("Failed to fetch PR #{number} from origin (exit code {exit_code}).")]
    FetchFailed { number: u64, exit_code: i32 },

    /// Checking out the fetched `pr-<n>` branch failed.
    #[error("Failed to check out fetched branch '{branch}' (exit code {exit_code}).")]
    CheckoutFailed { branch: String, exit_code: i32 },

    #[error(transparent)]
    Git(#[from] GitError),
}

impl MergeError {
    /// Process exit code for this failure. Every fatal merge error maps to 1.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

// ---------------------------------------------------------------------------
// Validation check errors
// ---------------------------------------------------------------------------

/// Errors from the validation runner that prevent it from running at all.
#[derive(Debug, Error)]
pub enum ChecksError {
    /// The modified-file listing could not be obtained.
    #[error("Failed to determine modified files: {0}")]
    ListFailed(String),

    /// A configured check command is empty.
    #[error("check command '{0}' is empty")]
    EmptyCommand(String),
}

// ---------------------------------------------------------------------------
// Transcript errors
// ---------------------------------------------------------------------------

/// Errors from fetching a shared chat transcript.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("timeout must be greater than 0 (got {0})")]
    InvalidTimeout(f64),

    #[error("transcript HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transcript request to {url} failed: HTTP {status}")]
    Status { url: String, status: u16 },
}

// ---------------------------------------------------------------------------
// Codex task errors
// ---------------------------------------------------------------------------

/// Errors from the codex-task workflow.
#[derive(Debug, Error)]
pub enum CodexError {
    #[error("Codex task HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Codex task request to {url} failed: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The task page has no GitHub pull request link.
    #[error("no GitHub pull request link found on {0}")]
    PrLinkNotFound(String),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

// ---------------------------------------------------------------------------
// File bundle errors
// ---------------------------------------------------------------------------

/// Errors from selecting and bundling local files.
#[derive(Debug, Error)]
pub enum FilesError {
    #[error("directory '{0}' does not exist or is not a directory")]
    NotADirectory(String),

    /// `--select` named a file that is not in the listing, or was not a number.
    #[error("invalid file selection '{input}': {detail}")]
    InvalidSelection { input: String, detail: String },
}

// ---------------------------------------------------------------------------
// Jira errors
// ---------------------------------------------------------------------------

/// Errors from loading a Jira issue.
#[derive(Debug, Error)]
pub enum JiraError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("issue JSON from {source_name} is invalid: {detail}")]
    InvalidJson { source_name: String, detail: String },

    #[error("Jira HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jira request to {url} failed: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        assert!(MergeError::DirtyWorktree
            .to_string()
            .contains("uncommitted changes"));

        let err = MergeError::AbortFailed {
            detail: "exit 128".into(),
        };
        assert!(err
            .to_string()
            .starts_with("Failed to abort merge automatically"));

        let err = GitHubError::RateLimited {
            reset_at: "1700000000".into(),
        };
        assert!(err.to_string().contains("rate limit"));

        let err = ChecksError::ListFailed("not a git repository".into());
        assert_eq!(
            err.to_string(),
            "Failed to determine modified files: not a git repository"
        );
    }

    #[test]
    fn test_process_error_not_found_mapping() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ProcessError::from_io("pre-commit", io);
        assert!(matches!(err, ProcessError::NotFound { ref program } if program == "pre-commit"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            ProcessError::from_io("git", io),
            ProcessError::Io { .. }
        ));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = MergeError::MergeInProgress.into();
        assert!(matches!(core_err, CoreError::Merge(_)));

        let merge_err: MergeError = GitError::EmptyRemote.into();
        assert_eq!(merge_err.exit_code(), 1);
    }
}
