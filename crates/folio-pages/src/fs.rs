//! Filesystem access used by discovery and the site builder.
//!
//! Everything goes through the [`FileSystem`] trait so tests can count or fake
//! physical I/O. [`TokioFs`] is the real implementation.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use walkdir::WalkDir;

/// A filesystem operation that failed on a specific path.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Failed to {op} {}: {source}", .path.display())]
pub struct FsError {
    /// Operation name, e.g. "read" or "copy"
    pub op: &'static str,
    /// Path the operation was applied to
    pub path: PathBuf,
    #[source]
    pub source: Arc<io::Error>,
}

impl FsError {
    pub fn new(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            op,
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Async filesystem collaborator.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a UTF-8 text file.
    async fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Write a text file, replacing any existing content.
    async fn write(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// Create a directory and all of its parents.
    async fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Copy a file, or a directory recursively, merging into `to`.
    async fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Remove a file or a directory tree. Missing paths are not an error.
    async fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Make `path` an empty directory, creating it if needed.
    async fn empty_dir(&self, path: &Path) -> Result<(), FsError>;

    async fn exists(&self, path: &Path) -> bool;
}

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl FileSystem for TokioFs {
    async fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FsError::new("read", path, e))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| FsError::new("write", path, e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| FsError::new("create directory", path, e))
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let metadata = tokio::fs::metadata(from)
            .await
            .map_err(|e| FsError::new("copy", from, e))?;

        if metadata.is_dir() {
            let (from, to) = (from.to_path_buf(), to.to_path_buf());
            let source = from.clone();
            return tokio::task::spawn_blocking(move || copy_dir_blocking(&from, &to))
                .await
                .map_err(|e| FsError::new("copy", source, io::Error::other(e)))?;
        }

        if let Some(parent) = to.parent() {
            self.create_dir_all(parent).await?;
        }
        tokio::fs::copy(from, to)
            .await
            .map(|_| ())
            .map_err(|e| FsError::new("copy", from, e))
    }

    async fn remove(&self, path: &Path) -> Result<(), FsError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::new("remove", path, e)),
        };

        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        result.map_err(|e| FsError::new("remove", path, e))
    }

    async fn empty_dir(&self, path: &Path) -> Result<(), FsError> {
        let mut entries = match tokio::fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return self.create_dir_all(path).await;
            }
            Err(e) => return Err(FsError::new("empty", path, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FsError::new("empty", path, e))?
        {
            self.remove(&entry.path()).await?;
        }

        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

fn copy_dir_blocking(from: &Path, to: &Path) -> Result<(), FsError> {
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| FsError::new("copy", from, io::Error::other(e)))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| FsError::new("create directory", &target, e))?;
        } else {
            std::fs::copy(entry.path(), &target)
                .map_err(|e| FsError::new("copy", entry.path(), e))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_directory_tree() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("index.html"), "root").unwrap();
        fs::write(src.join("a/b/index.html"), "nested").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("keep.txt"), "kept").unwrap();

        TokioFs.copy(&src, &dst).await.unwrap();

        assert_eq!(fs::read_to_string(dst.join("index.html")).unwrap(), "root");
        assert_eq!(fs::read_to_string(dst.join("a/b/index.html")).unwrap(), "nested");
        assert!(dst.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn copies_single_file_into_new_directory() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();

        TokioFs
            .copy(&temp.path().join("a.txt"), &temp.path().join("x/y/b.txt"))
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("x/y/b.txt")).unwrap(), "a");
    }

    #[tokio::test]
    async fn empties_existing_directory() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("out");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("old.html"), "stale").unwrap();

        TokioFs.empty_dir(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn remove_ignores_missing_path() {
        let temp = tempdir().unwrap();

        TokioFs.remove(&temp.path().join("missing")).await.unwrap();
    }

    #[tokio::test]
    async fn read_reports_not_found() {
        let temp = tempdir().unwrap();

        let err = TokioFs
            .read_to_string(&temp.path().join("missing.md"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("missing.md"));
    }
}
