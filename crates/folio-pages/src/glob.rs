//! Glob search over a pages directory.

use std::io;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use walkdir::{DirEntry, WalkDir};

use crate::fs::FsError;

/// A file matched by [`glob_find`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlobMatch {
    /// Path relative to the search base, always `/`-separated
    pub relative: String,

    /// Absolute path of the file
    pub absolute: PathBuf,
}

/// Errors that can occur during a glob search.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GlobError {
    #[error("Invalid glob pattern \"{pattern}\": {message}")]
    Pattern { pattern: String, message: String },

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("Glob search task failed: {0}")]
    Task(String),
}

/// Find files under `base_dir` whose relative path matches `pattern`.
///
/// `*` does not cross directory boundaries, `**` does. Hidden directories and
/// `node_modules` are never searched. Results are deduplicated and sorted by
/// relative path. An unreadable directory or a symlink loop fails the search.
pub fn glob_find(base_dir: &Path, pattern: &str) -> Result<Vec<GlobMatch>, GlobError> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| GlobError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?
        .compile_matcher();

    let base_dir = std::path::absolute(base_dir).map_err(|e| FsError::new("search", base_dir, e))?;
    if !base_dir.is_dir() {
        return Err(FsError::new(
            "search",
            &base_dir,
            io::Error::new(io::ErrorKind::NotFound, "pages directory not found"),
        )
        .into());
    }

    let mut matches = Vec::new();

    for entry in WalkDir::new(&base_dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e))
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&base_dir).to_path_buf();
            FsError::new("search", path, io::Error::from(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(&base_dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if matcher.is_match(&relative) {
            matches.push(GlobMatch {
                relative,
                absolute: entry.path().to_path_buf(),
            });
        }
    }

    matches.sort();
    matches.dedup_by(|a, b| a.relative == b.relative);

    Ok(matches)
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && (name.starts_with('.') || name == "node_modules")
}
