// Local filesystem adapter - File system operations through tokio::fs

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ShrinkResult;
use crate::ports::FsPort;
use crate::utils::path::append_lexically;

/// Filesystem adapter for the local disk
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFsAdapter;

impl LocalFsAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FsPort for LocalFsAdapter {
    async fn file_exists(&self, path: &Path) -> ShrinkResult<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    async fn file_size(&self, path: &Path) -> ShrinkResult<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    async fn delete_file(&self, path: &Path) -> ShrinkResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_directory(&self, path: &Path) -> ShrinkResult<()> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn resolve_path(&self, path: &Path) -> ShrinkResult<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        // canonicalize the longest existing prefix, then append the rest
        let components: Vec<Component<'_>> = absolute.components().collect();
        for split in (1..=components.len()).rev() {
            let head: PathBuf = components[..split].iter().collect();
            if let Ok(resolved) = tokio::fs::canonicalize(&head).await {
                return Ok(append_lexically(resolved, &components[split..]));
            }
        }
        Ok(append_lexically(PathBuf::new(), &components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFsAdapter::new();
        let nested = dir.path().join("a").join("b");
        fs.create_directory(&nested).await.unwrap();

        let file = nested.join("clip.mp4");
        assert!(!fs.file_exists(&file).await.unwrap());

        tokio::fs::write(&file, b"12345").await.unwrap();
        assert!(fs.file_exists(&file).await.unwrap());
        assert_eq!(fs.file_size(&file).await.unwrap(), 5);

        fs.delete_file(&file).await.unwrap();
        assert!(!fs.file_exists(&file).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFsAdapter::new();
        assert!(fs.delete_file(&dir.path().join("missing.mp4")).await.is_ok());
    }

    #[tokio::test]
    async fn test_file_size_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFsAdapter::new();
        assert!(fs.file_size(&dir.path().join("missing.mp4")).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_path_of_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFsAdapter::new();
        let root = tokio::fs::canonicalize(dir.path()).await.unwrap();

        let spelled = dir.path().join(".").join("gone").join("..").join("clip.mp4");
        assert_eq!(fs.resolve_path(&spelled).await.unwrap(), root.join("clip.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_path_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFsAdapter::new();
        let real = dir.path().join("real");
        tokio::fs::create_dir(&real).await.unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();

        let through_link = fs
            .resolve_path(&dir.path().join("link").join("clip.mp4"))
            .await
            .unwrap();
        let direct = fs.resolve_path(&real.join("clip.mp4")).await.unwrap();
        assert_eq!(through_link, direct);
    }
}
