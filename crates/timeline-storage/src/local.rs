use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{StorageError, StorageResult};
use crate::naming::unique_name;

/// A file written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated storage name, unique within the directory
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Destination of an upload's bytes that can be flushed to disk
pub(crate) trait UploadSink: AsyncWrite + Unpin + Send {
    fn sync(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

impl UploadSink for fs::File {
    fn sync(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        self.sync_all()
    }
}

/// Local filesystem storage over a single flat directory
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create the storage, making sure the directory exists.
    ///
    /// # Arguments
    /// * `base_path` - Upload directory (e.g., "uploads")
    /// * `base_url` - URL prefix the directory is served under (e.g., "/uploads")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Map a file name to its path, rejecting anything that is not a plain
    /// name inside the directory.
    pub fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty()
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(name))
    }

    /// Public URL of a stored file.
    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// File name a public URL refers to.
    ///
    /// URLs under a different prefix still resolve to their last path
    /// component, matching how records written before a prefix change are served.
    pub fn name_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let name = url
            .strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or_else(|| url.rsplit('/').next().unwrap_or(url));
        (!name.is_empty()).then_some(name)
    }

    /// Write upload bytes under a fresh collision-resistant name derived from
    /// `original_name`.
    pub async fn persist(&self, original_name: &str, data: &[u8]) -> StorageResult<StoredFile> {
        let name = unique_name(original_name);
        let path = self.path_for(&name)?;
        let start = Instant::now();

        let file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        self.fill(&path, file, data).await?;

        tracing::info!(
            path = %path.display(),
            name = %name,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(StoredFile {
            name,
            path,
            size: data.len() as u64,
        })
    }

    /// Write and sync `data` into the freshly created `path`. On failure the
    /// partial file is removed so no unreferenced upload is left behind.
    async fn fill<S: UploadSink>(&self, path: &Path, mut sink: S, data: &[u8]) -> StorageResult<()> {
        let written = async {
            sink.write_all(data).await?;
            sink.sync().await
        }
        .await;
        drop(sink);

        let Err(e) = written else {
            return Ok(());
        };
        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(cleanup) if cleanup.kind() == io::ErrorKind::NotFound => {}
            Err(cleanup) => tracing::warn!(
                path = %path.display(),
                error = %cleanup,
                "Failed to remove partial upload"
            ),
        }
        Err(StorageError::UploadFailed(format!(
            "Failed to write file {}: {}",
            path.display(),
            e
        )))
    }

    /// Size in bytes of a stored file.
    pub async fn size(&self, name: &str) -> StorageResult<u64> {
        let path = self.path_for(name)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    pub async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Remove a file. An already-missing file is not an error; the return
    /// value says whether anything was removed.
    pub async fn remove_if_present(&self, name: &str) -> StorageResult<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed stored file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Names of all regular files in the directory, sorted.
    pub async fn list_names(&self) -> StorageResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "/uploads/").await.unwrap()
    }

    #[tokio::test]
    async fn test_persist_writes_unique_file() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let stored = storage.persist("holiday clip.mov", b"abc").await.unwrap();
        assert!(stored.name.ends_with("_holiday_clip.mov"));
        assert_eq!(stored.size, 3);
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"abc");
        assert_eq!(storage.size(&stored.name).await.unwrap(), 3);
        assert_eq!(
            storage.url_for(&stored.name),
            format!("/uploads/{}", stored.name)
        );
    }

    #[tokio::test]
    async fn test_persist_fails_when_directory_is_gone() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("uploads");
        let storage = storage(&root).await;
        std::fs::remove_dir(&root).unwrap();
        std::fs::write(&root, b"not a directory").unwrap();

        let result = storage.persist("clip.mp4", b"abc").await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }

    /// Accepts nothing: fails on write, or on sync when `fail_on_sync`
    struct BrokenSink {
        fail_on_sync: bool,
    }

    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<io::Result<usize>> {
            if self.fail_on_sync {
                std::task::Poll::Ready(Ok(buf.len()))
            } else {
                std::task::Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "no space left")))
            }
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    impl UploadSink for BrokenSink {
        fn sync(&mut self) -> impl Future<Output = io::Result<()>> + Send {
            std::future::ready(Err(io::Error::new(io::ErrorKind::Other, "sync failed")))
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_file() {
        for fail_on_sync in [false, true] {
            let dir = tempdir().unwrap();
            let storage = storage(dir.path()).await;
            let path = storage.path_for("u1_clip.mov").unwrap();
            std::fs::write(&path, b"half written").unwrap();

            let result = storage
                .fill(&path, BrokenSink { fail_on_sync }, b"video bytes")
                .await;
            assert!(matches!(result, Err(StorageError::UploadFailed(_))));
            assert!(storage.list_names().await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert!(matches!(
            storage.remove_if_present("../etc/passwd").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            storage.exists("nested/file.mp4").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(storage.path_for(""), Err(StorageError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_remove_if_present_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::write(dir.path().join("clip.mp4"), b"x").unwrap();

        assert!(storage.remove_if_present("clip.mp4").await.unwrap());
        assert!(!storage.remove_if_present("clip.mp4").await.unwrap());
        assert!(!storage.exists("clip.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn test_size_of_missing_file() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        assert!(matches!(
            storage.size("missing.mp4").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_names_skips_directories() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::write(dir.path().join("b.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(storage.list_names().await.unwrap(), vec!["a.mp4", "b.mp4"]);
    }

    #[tokio::test]
    async fn test_name_from_url() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        assert_eq!(storage.name_from_url("/uploads/x_clip.mp4"), Some("x_clip.mp4"));
        assert_eq!(
            storage.name_from_url("https://cdn.example.com/media/x_clip.mp4"),
            Some("x_clip.mp4")
        );
        assert_eq!(storage.name_from_url("/uploads/"), None);
    }
}
