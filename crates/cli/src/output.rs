//! Terminal rendering of workflow progress and command output.

use std::path::Path;

use anyhow::{Context, Result};
use f2clipboard_core::progress::Progress;

use crate::style;

/// Prints progress lines. Warnings and errors always go to stderr; info
/// goes to stdout unless stdout is reserved for the command's document.
pub struct ConsoleProgress {
    info_to_stderr: bool,
}

impl ConsoleProgress {
    pub fn stdout() -> Self {
        Self {
            info_to_stderr: false,
        }
    }

    /// For commands whose stdout is Markdown meant to be piped.
    pub fn stderr() -> Self {
        Self {
            info_to_stderr: true,
        }
    }
}

impl Progress for ConsoleProgress {
    fn info(&self, message: &str) {
        if self.info_to_stderr {
            eprintln!("{}", style::dim(message));
        } else {
            println!("{}", message);
        }
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", style::warn(message));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", style::error(message));
    }
}

/// Print `document` and, when `path` is set, also write it there.
pub fn emit(document: &str, path: Option<&Path>) -> Result<()> {
    println!("{}", document);
    if let Some(path) = path {
        std::fs::write(path, document)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("{}", style::success(&format!("Wrote {}", path.display())));
    }
    Ok(())
}
