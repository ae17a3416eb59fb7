//! `f2clipboard files`

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use f2clipboard_core::files::{parse_selection, render_markdown, FileSelector};

use crate::output;
use crate::style;

#[derive(Args, Debug)]
pub struct FilesArgs {
    /// Directory to search.
    #[arg(long = "dir", default_value = ".")]
    pub dir: PathBuf,

    /// Glob matched against file names, e.g. `*.py` or `*.{py,js}`.
    #[arg(long, default_value = "*")]
    pub pattern: String,

    /// Extra glob to exclude; repeatable. A trailing `/` matches directories only.
    #[arg(long = "exclude")]
    pub excludes: Vec<String>,

    /// Skip files larger than this many bytes.
    #[arg(long)]
    pub max_size: Option<u64>,

    /// Bundle every matching file.
    #[arg(long, conflicts_with = "select")]
    pub all: bool,

    /// Comma-separated numbers from the listing to bundle, e.g. `1,4,5`.
    #[arg(long)]
    pub select: Option<String>,

    /// List the files that would be bundled without reading them.
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the Markdown to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: FilesArgs) -> Result<i32> {
    let selector = FileSelector::new(&args.pattern, &args.excludes, args.max_size);
    let files = selector.list(&args.dir)?;
    if files.is_empty() {
        eprintln!(
            "{}",
            style::warn("No suitable files found. Binary and image files are excluded automatically.")
        );
        return Ok(0);
    }

    let selected: Vec<String> = if args.all {
        files
    } else if let Some(ref input) = args.select {
        parse_selection(input, files.len())?
            .into_iter()
            .filter_map(|i| files.get(i).cloned())
            .collect()
    } else {
        for (i, file) in files.iter().enumerate() {
            println!("{}. {}", i + 1, file);
        }
        eprintln!(
            "{}",
            style::dim("Pass --all, or --select with numbers from this list (e.g. --select 1,3), to bundle files.")
        );
        return Ok(0);
    };

    if args.dry_run {
        eprintln!("{}", style::header(&format!("Would bundle {} file(s):", selected.len())));
        for file in &selected {
            println!("{}", file);
        }
        return Ok(0);
    }

    output::emit(&render_markdown(&args.dir, &selected), args.output.as_deref())?;
    Ok(0)
}
