//! External program execution.
//!
//! Every `git`, `pre-commit` and test-runner call goes through the
//! [`ProcessRunner`] trait so workflows can be exercised with a scripted
//! runner in tests. Calls have no timeout and block until the child exits.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::errors::ProcessError;

/// A program, its arguments and the directory to run it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion capturing stdout and stderr.
    async fn output(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError>;

    /// Run to completion with inherited stdio, returning the exit code.
    async fn status(&self, invocation: &Invocation) -> Result<i32, ProcessError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).current_dir(&invocation.cwd);
        cmd
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn output(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        debug!(cmd = %invocation, cwd = %invocation.cwd.display(), "running command");
        let output = Self::command(invocation)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProcessError::from_io(&invocation.program, e))?;

        Ok(ProcessOutput {
            // Killed by a signal: no code.
            exit_code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn status(&self, invocation: &Invocation) -> Result<i32, ProcessError> {
        debug!(cmd = %invocation, cwd = %invocation.cwd.display(), "running command");
        let status = Self::command(invocation)
            .status()
            .await
            .map_err(|e| ProcessError::from_io(&invocation.program, e))?;
        Ok(status.code().unwrap_or(1))
    }
}
