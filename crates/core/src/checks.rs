//! Validation runner: a static-check pass over modified files, then the
//! test suite.
//!
//! The static check is scoped to the target files and skipped when there
//! are none. Its non-zero exit short-circuits the test step and becomes the
//! result. A missing binary counts as exit code 127, like a shell would
//! report it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ChecksSettings;
use crate::errors::{ChecksError, ProcessError};
use crate::git::GitClient;
use crate::process::{Invocation, ProcessRunner};
use crate::progress::Progress;

/// Exit code reported when a check binary cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;

pub struct CheckRunner {
    repo: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    static_check: Vec<String>,
    test_command: Vec<String>,
}

impl CheckRunner {
    pub fn new(
        repo: impl AsRef<Path>,
        runner: Arc<dyn ProcessRunner>,
        settings: &ChecksSettings,
    ) -> Self {
        Self {
            repo: repo.as_ref().to_path_buf(),
            runner,
            static_check: settings.static_check.clone(),
            test_command: settings.test_command.clone(),
        }
    }

    /// Run the checks and return the exit code to propagate.
    ///
    /// With `files` unset the targets are the modified, added, renamed and
    /// copied paths from `git status`.
    pub async fn run_checks(
        &self,
        files: Option<Vec<String>>,
        progress: &dyn Progress,
    ) -> Result<i32, ChecksError> {
        let files = match files {
            Some(files) => files,
            None => self.modified_files().await?,
        };

        if files.is_empty() {
            progress.info(&format!(
                "No modified files detected; skipping {}.",
                program_name(&self.static_check)
            ));
        } else {
            progress.info(&format!(
                "Running {} on {} file(s)…",
                program_name(&self.static_check),
                files.len()
            ));
            let code = self.run_step(&self.static_check, &files, progress).await?;
            if code != 0 {
                warn!(exit_code = code, "static checks failed, skipping tests");
                return Ok(code);
            }
        }

        progress.info(&format!("Running {}…", self.test_command.join(" ")));
        let code = self.run_step(&self.test_command, &[], progress).await?;
        if code != 0 {
            warn!(exit_code = code, "test suite failed");
            return Ok(code);
        }

        progress.info("Checks completed successfully.");
        Ok(0)
    }

    async fn modified_files(&self) -> Result<Vec<String>, ChecksError> {
        let git = GitClient::new(&self.repo, Arc::clone(&self.runner));
        let output = git
            .status_porcelain_z()
            .await
            .map_err(|e| ChecksError::ListFailed(e.to_string()))?;
        let files = parse_porcelain(&output);
        debug!(count = files.len(), "collected modified files");
        Ok(files)
    }

    async fn run_step(
        &self,
        command: &[String],
        extra: &[String],
        progress: &dyn Progress,
    ) -> Result<i32, ChecksError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ChecksError::EmptyCommand(command.join(" ")))?;
        let invocation = Invocation::new(program.as_str(), &self.repo)
            .args(args.iter().cloned())
            .args(extra.iter().cloned());

        match self.runner.status(&invocation).await {
            Ok(code) => {
                info!(cmd = %invocation, exit_code = code, "check finished");
                Ok(code)
            }
            Err(e @ ProcessError::NotFound { .. }) => {
                progress.error(&format!("{}; is it installed?", e));
                Ok(EXIT_NOT_FOUND)
            }
            Err(e) => {
                progress.error(&e.to_string());
                Ok(1)
            }
        }
    }
}

fn program_name(command: &[String]) -> &str {
    command.first().map(String::as_str).unwrap_or("static checks")
}

/// Paths from `git status --porcelain` output, in either format.
///
/// NUL-delimited (`-z`) output is split into records; for rename and copy
/// entries the record holds the new path and the following record holds
/// the original path, which is consumed and dropped. Line output has quoted
/// paths unescaped and `old -> new` resolved to `new`. Deleted entries are
/// skipped in both formats.
pub fn parse_porcelain(output: &str) -> Vec<String> {
    if output.contains('\0') {
        parse_porcelain_z(output)
    } else {
        parse_porcelain_lines(output)
    }
}

fn parse_porcelain_z(output: &str) -> Vec<String> {
    let mut files = Vec::new();
    let mut records = output.split('\0').filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        let Some((status, path)) = split_record(record) else {
            continue;
        };
        if status.starts_with(['R', 'C']) {
            // origin path of the rename / copy
            let _ = records.next();
        }
        if status.contains('D') || path.is_empty() {
            continue;
        }
        files.push(path.to_string());
    }
    files
}

fn parse_porcelain_lines(output: &str) -> Vec<String> {
    let mut files = Vec::new();
    for line in output.lines() {
        let Some((status, path)) = split_record(line) else {
            continue;
        };
        if status.contains('D') {
            continue;
        }
        let path = match path.split_once(" -> ") {
            Some((_, new)) => new.trim(),
            None => path.trim(),
        };
        let path = unquote(path);
        if !path.is_empty() {
            files.push(path);
        }
    }
    files
}

/// `XY path` -> (`XY`, `path`).
fn split_record(record: &str) -> Option<(&str, &str)> {
    if record.len() < 4 || !record.is_char_boundary(2) || !record.is_char_boundary(3) {
        return None;
    }
    Some((&record[..2], &record[3..]))
}

/// Undo git's C-style quoting of unusual paths.
fn unquote(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('"') => bytes.push(b'"'),
            Some('\\') => bytes.push(b'\\'),
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(v) => {
                            value = value * 8 + v;
                            chars.next();
                        }
                        None => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => {
                bytes.push(b'\\');
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Express explicit `--file` paths relative to `repo` when they lie inside
/// it; paths outside are kept absolute.
pub fn relative_to_repo(repo: &Path, paths: &[PathBuf]) -> Vec<String> {
    let repo_root = repo.canonicalize().unwrap_or_else(|_| repo.to_path_buf());
    paths
        .iter()
        .map(|path| {
            let joined = if path.is_absolute() {
                path.clone()
            } else {
                repo_root.join(path)
            };
            let resolved = joined.canonicalize().unwrap_or(joined);
            match resolved.strip_prefix(&repo_root) {
                Ok(rel) => rel.to_string_lossy().into_owned(),
                Err(_) => resolved.to_string_lossy().into_owned(),
            }
        })
        .collect()
}
