//! Local files bundled into a Markdown document.
//!
//! [`FileSelector`] walks a directory and decides, per file:
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | Path or name matches an exclude pattern | `Excluded` |
//! | Extension is a known binary / image type | `Binary` |
//! | Size exceeds `max_size` | `Oversize` |
//! | Name matches none of the include patterns | `NoMatch` |
//! | None of the above | `Include` |
//!
//! `.git` is always excluded. An exclude pattern ending in `/` only prunes
//! directories.

use std::path::Path;

use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::errors::FilesError;

/// Extensions never bundled, compared case-insensitively.
pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    // Images
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp", ".ico", ".svg", ".heic", ".heif",
    // Archives and documents
    ".pdf", ".zip", ".tar", ".gz", ".rar", ".7z",
    // Video
    ".mp4", ".avi", ".mov", ".wmv", ".flv", ".mkv",
    // Audio
    ".mp3", ".wav", ".ogg", ".m4a", ".flac",
    // Fonts
    ".ttf", ".otf", ".woff", ".woff2",
    // Executables and libraries
    ".exe", ".dll", ".so", ".dylib",
    // Design files
    ".psd", ".ai", ".sketch",
    // Finder metadata
    ".ds_store",
];

const ALWAYS_EXCLUDED: &str = ".git";

pub fn is_binary_or_image(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    EXCLUDED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Expand the first `{a,b}` group: `*.{py, js}` -> `["*.py", "*.js"]`.
/// Alternatives are trimmed and empty ones dropped.
pub fn expand_pattern(pattern: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (pattern.find('{'), pattern.find('}')) else {
        return vec![pattern.to_string()];
    };
    if close < open {
        return vec![pattern.to_string()];
    }
    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let expanded: Vec<String> = pattern[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(|option| format!("{}{}{}", prefix, option, suffix))
        .collect();
    if expanded.is_empty() {
        vec![format!("{}{}", prefix, suffix)]
    } else {
        expanded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDecision {
    Include,
    NoMatch,
    Excluded { pattern: String },
    Binary,
    Oversize { size: u64, limit: u64 },
}

impl FileDecision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::NoMatch => "no-match",
            Self::Excluded { .. } => "excluded",
            Self::Binary => "binary",
            Self::Oversize { .. } => "oversize",
        }
    }
}

#[derive(Debug, Clone)]
struct ExcludePattern {
    glob: String,
    dirs_only: bool,
}

#[derive(Debug, Clone)]
pub struct FileSelector {
    patterns: Vec<String>,
    excludes: Vec<ExcludePattern>,
    max_size: Option<u64>,
}

impl FileSelector {
    pub fn new(pattern: &str, excludes: &[String], max_size: Option<u64>) -> Self {
        let excludes = std::iter::once(ALWAYS_EXCLUDED)
            .chain(excludes.iter().map(String::as_str))
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                let p = p.trim().replace('\\', "/");
                let dirs_only = p.ends_with('/');
                ExcludePattern {
                    glob: p.trim_end_matches('/').to_string(),
                    dirs_only,
                }
            })
            .collect();
        Self {
            patterns: expand_pattern(pattern),
            excludes,
            max_size,
        }
    }

    /// Decide on a file given its `/`-separated path relative to the walk
    /// root and its size in bytes.
    pub fn evaluate(&self, rel_path: &str, size: u64) -> FileDecision {
        let name = file_name(rel_path);

        if let Some(pattern) = self
            .excludes
            .iter()
            .filter(|p| !p.dirs_only)
            .find(|p| matches(&p.glob, rel_path, name))
        {
            return FileDecision::Excluded {
                pattern: pattern.glob.clone(),
            };
        }
        if is_binary_or_image(name) {
            return FileDecision::Binary;
        }
        if let Some(limit) = self.max_size {
            if size > limit {
                return FileDecision::Oversize { size, limit };
            }
        }
        if !self.patterns.iter().any(|p| matches(p, rel_path, name)) {
            return FileDecision::NoMatch;
        }
        FileDecision::Include
    }

    fn excluded_dir(&self, rel_path: &str) -> Option<&str> {
        let name = file_name(rel_path);
        self.excludes
            .iter()
            .find(|p| matches(&p.glob, rel_path, name))
            .map(|p| p.glob.as_str())
    }

    /// Every included file under `dir`, as sorted `/`-separated paths
    /// relative to `dir`. Unreadable entries are skipped with a warning.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn list(&self, dir: &Path) -> Result<Vec<String>, FilesError> {
        if !dir.is_dir() {
            return Err(FilesError::NotADirectory(dir.display().to_string()));
        }

        let walker = WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let rel = relative_path(dir, entry.path());
                match self.excluded_dir(&rel) {
                    Some(pattern) => {
                        debug!(path = %rel, pattern, "skipping directory");
                        false
                    }
                    None => true,
                }
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = relative_path(dir, entry.path());
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            match self.evaluate(&rel, size) {
                FileDecision::Include => files.push(rel),
                decision => debug!(path = %rel, decision = decision.label(), "skipping file"),
            }
        }
        debug!(count = files.len(), "files selected");
        Ok(files)
    }
}

fn matches(glob: &str, rel_path: &str, name: &str) -> bool {
    glob_match::glob_match(glob, name) || glob_match::glob_match(glob, rel_path)
}

fn file_name(rel_path: &str) -> &str {
    rel_path.rsplit('/').next().unwrap_or(rel_path)
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse `1, 4,5` into zero-based indices into a listing of `count` files,
/// keeping the first occurrence of repeated numbers.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, FilesError> {
    let invalid = |detail: String| FilesError::InvalidSelection {
        input: input.to_string(),
        detail,
    };

    let mut indices = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let number: usize = part
            .parse()
            .map_err(|_| invalid(format!("'{}' is not a number", part)))?;
        if number == 0 || number > count {
            return Err(invalid(format!("{} is not between 1 and {}", number, count)));
        }
        if !indices.contains(&(number - 1)) {
            indices.push(number - 1);
        }
    }
    if indices.is_empty() {
        return Err(invalid("no file numbers given".to_string()));
    }
    Ok(indices)
}

/// Each file's relative path followed by its contents in a fenced block,
/// wrapped in `^^^` markers. Unreadable files get an inline error instead.
pub fn render_markdown(dir: &Path, files: &[String]) -> String {
    let mut out = String::from("^^^\n## Selected Files\n\n");
    for rel in files {
        let body = match std::fs::read(dir.join(rel)) {
            Ok(bytes) => String::from_utf8(bytes)
                .unwrap_or_else(|_| "[ERROR: Could not decode file contents]".to_string()),
            Err(e) => format!("[ERROR: {}]", e),
        };
        out.push_str(&format!("{}:\n\n```\n{}\n```\n\n", rel, body));
    }
    out.push_str("^^^\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = tmp.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(full, content).unwrap();
        }
        tmp
    }

    fn list(dir: &TempDir, pattern: &str, excludes: &[&str], max_size: Option<u64>) -> Vec<String> {
        let excludes: Vec<String> = excludes.iter().map(|s| s.to_string()).collect();
        FileSelector::new(pattern, &excludes, max_size)
            .list(dir.path())
            .unwrap()
    }

    #[test]
    fn test_expand_pattern() {
        assert_eq!(expand_pattern("*.py"), vec!["*.py"]);
        assert_eq!(expand_pattern("*.{py, js}"), vec!["*.py", "*.js"]);
        assert_eq!(expand_pattern("*.{py,}"), vec!["*.py"]);
        assert_eq!(expand_pattern("src/{a,b}.rs"), vec!["src/a.rs", "src/b.rs"]);
        assert_eq!(expand_pattern("odd}{"), vec!["odd}{"]);
    }

    #[test]
    fn test_binary_and_image_detection() {
        assert!(is_binary_or_image("photo.heic"));
        assert!(is_binary_or_image("LOGO.PNG"));
        assert!(is_binary_or_image(".DS_Store"));
        assert!(!is_binary_or_image("notes.txt"));
        assert!(!is_binary_or_image("archive.rs"));
    }

    #[test]
    fn test_decisions() {
        let selector = FileSelector::new("*.py", &["secret.py".to_string()], Some(10));
        assert_eq!(selector.evaluate("a.py", 1), FileDecision::Include);
        assert_eq!(selector.evaluate("a.txt", 1), FileDecision::NoMatch);
        assert_eq!(selector.evaluate("img/a.png", 1), FileDecision::Binary);
        assert_eq!(
            selector.evaluate("big.py", 11),
            FileDecision::Oversize { size: 11, limit: 10 }
        );
        assert_eq!(
            selector.evaluate("pkg/secret.py", 1),
            FileDecision::Excluded {
                pattern: "secret.py".into()
            }
        );
    }

    #[test]
    fn test_lists_recursively_with_brace_pattern() {
        let dir = tree(&[
            ("a.py", "a"),
            ("src/lib.rs", "lib"),
            ("notes.txt", "n"),
            ("logo.png", "png"),
        ]);
        assert_eq!(list(&dir, "*.{py, rs}", &[], None), vec!["a.py", "src/lib.rs"]);
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = tree(&[("a.py", "a"), ("b.py", "b")]);
        assert_eq!(list(&dir, "*.py", &["b.py"], None), vec!["a.py"]);
    }

    #[test]
    fn test_trailing_slash_prunes_directories_only() {
        let dir = tree(&[("ignored/file.txt", "data"), ("keep/ignored", "file")]);
        assert_eq!(list(&dir, "*", &["ignored/"], None), vec!["keep/ignored"]);
    }

    #[test]
    fn test_git_directory_always_skipped() {
        let dir = tree(&[(".git/config", "x"), ("README.md", "r")]);
        assert_eq!(list(&dir, "*", &[], None), vec!["README.md"]);
    }

    #[test]
    fn test_max_size() {
        let dir = tree(&[("small.txt", "a"), ("large.txt", "bbbbbbbbbb")]);
        assert_eq!(list(&dir, "*.txt", &[], Some(5)), vec!["small.txt"]);
    }

    #[test]
    fn test_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let err = FileSelector::new("*", &[], None)
            .list(&tmp.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, FilesError::NotADirectory(_)));
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1, 4,5", 5).unwrap(), vec![0, 3, 4]);
        assert_eq!(parse_selection("2,2,1", 2).unwrap(), vec![1, 0]);
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("x", 3).is_err());
        assert!(parse_selection(" , ", 3).is_err());
    }

    #[test]
    fn test_render_markdown() {
        let dir = tree(&[("a.py", "print('a')"), ("src/b.rs", "fn b() {}")]);
        std::fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0x00]).unwrap();

        let md = render_markdown(
            dir.path(),
            &["a.py".to_string(), "src/b.rs".to_string(), "bad.txt".to_string()],
        );
        assert!(md.starts_with("^^^\n## Selected Files\n\n"));
        assert!(md.contains("a.py:\n\n```\nprint('a')\n```\n\n"));
        assert!(md.contains("src/b.rs:\n\n```\nfn b() {}\n```\n\n"));
        assert!(md.contains("bad.txt:\n\n```\n[ERROR: Could not decode file contents]\n```"));
        assert!(md.ends_with("^^^\n"));
    }
}
