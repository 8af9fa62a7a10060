//! Filesystem access for the template layer
//!
//! Every existence check, stat and read of prompt and partial files goes
//! through [`SourceFs`], so the I/O boundary is a single seam.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::debug;

/// Asynchronous filesystem operations used by the template cache
#[async_trait]
pub trait SourceFs: Send + Sync {
    /// Whether the path exists
    async fn exists(&self, path: &Path) -> bool;

    /// Last-modified time of the path
    async fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Read the whole file as UTF-8
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// File names (not paths) of the entries in a directory
    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// [`SourceFs`] over the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl SourceFs for LocalFs {
    async fn exists(&self, path: &Path) -> bool {
        let exists = tokio::fs::try_exists(path).await.unwrap_or(false);
        debug!(?path, %exists, "LocalFs::exists: called");
        exists
    }

    async fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        debug!(?path, "LocalFs::modified: called");
        tokio::fs::metadata(path).await?.modified()
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        debug!(?path, "LocalFs::read_to_string: called");
        tokio::fs::read_to_string(path).await
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        debug!(?path, "LocalFs::list_dir: called");
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_fs_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.yaml");
        std::fs::write(&file, "hello").unwrap();

        let fs = LocalFs;
        assert!(fs.exists(&file).await);
        assert!(!fs.exists(&dir.path().join("missing")).await);
        assert_eq!(fs.read_to_string(&file).await.unwrap(), "hello");
        assert!(fs.modified(&file).await.is_ok());
        assert_eq!(fs.list_dir(dir.path()).await.unwrap(), vec!["a.yaml".to_string()]);
    }

    #[tokio::test]
    async fn test_local_fs_missing_dir() {
        let fs = LocalFs;
        assert!(fs.list_dir(Path::new("/nonexistent/dir")).await.is_err());
    }
}
