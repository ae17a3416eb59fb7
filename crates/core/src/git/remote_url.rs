//! Repository and pull-request identifier parsing.
//!
//! Two inputs name a pull request: the `--pr` argument (a bare number or a
//! `github.com/<owner>/<repo>/pull/<n>` URL) and, when the argument carries
//! no repository, the local `origin` remote URL.

use std::fmt;

use crate::errors::GitError;

/// `owner/name` pair addressing a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parsed `--pr` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrIdentifier {
    pub number: u64,
    /// Present when the value was a URL.
    pub repo: Option<RepoSlug>,
}

/// Parse a PR number or `http(s)://github.com/<owner>/<repo>/pull/<n>` URL.
pub fn parse_pr_identifier(value: &str) -> Result<PrIdentifier, GitError> {
    let value = value.trim();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(number) = value.parse() {
            return Ok(PrIdentifier { number, repo: None });
        }
    }
    match parse_pull_request_url(value) {
        Some((repo, number)) => Ok(PrIdentifier {
            number,
            repo: Some(repo),
        }),
        None => Err(GitError::InvalidPrIdentifier(value.to_string())),
    }
}

/// Split a github.com pull request URL into its repository and number.
///
/// Anything after the number (`/files`, `?query`, `#fragment`) is ignored.
pub fn parse_pull_request_url(url: &str) -> Option<(RepoSlug, u64)> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let rest = rest.strip_prefix("github.com/")?;

    let mut parts = rest.splitn(4, '/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let name = parts.next().filter(|s| !s.is_empty())?;
    if parts.next()? != "pull" {
        return None;
    }
    let tail = parts.next()?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    let number = digits.parse().ok()?;
    Some((RepoSlug::new(owner, name), number))
}

/// Derive `owner/repo` from an origin remote URL.
///
/// Accepts SCP-style SSH (`git@github.com:owner/repo.git`) and any URL
/// containing `github.com/` (HTTPS, `ssh://`, credentials in the authority).
pub fn parse_remote_slug(url: &str) -> Result<RepoSlug, GitError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(GitError::EmptyRemote);
    }

    let path = if url.starts_with("git@") {
        url.split_once(':').map(|(_, path)| path).unwrap_or("")
    } else if let Some((_, path)) = url.split_once("github.com/") {
        path
    } else {
        return Err(GitError::UnsupportedRemote(url.to_string()));
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    match path.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok(RepoSlug::new(owner, name))
        }
        _ => Err(GitError::InvalidRemote(url.to_string())),
    }
}
