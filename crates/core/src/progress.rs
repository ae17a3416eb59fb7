//! User-facing progress reporting.
//!
//! The core never prints. Workflows narrate through a [`Progress`]
//! implementation supplied by the caller: the CLI renders messages to the
//! terminal, tests record them.

/// Receives human-readable status lines from long-running workflows.
pub trait Progress: Send + Sync {
    /// Normal step narration.
    fn info(&self, message: &str);

    /// A best-effort step degraded; execution continues.
    fn warn(&self, message: &str);

    /// A step failed in a way the user must act on.
    fn error(&self, message: &str);
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::Progress;

    /// Collects messages prefixed with their level.
    #[derive(Default)]
    pub struct RecordingProgress {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingProgress {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.lines().iter().any(|l| l.contains(needle))
        }

        fn push(&self, level: &str, message: &str) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{}: {}", level, message));
        }
    }

    impl Progress for RecordingProgress {
        fn info(&self, message: &str) {
            self.push("info", message);
        }
        fn warn(&self, message: &str) {
            self.push("warn", message);
        }
        fn error(&self, message: &str) {
            self.push("error", message);
        }
    }
}
