//! Per-bucket filesystem handles and the native paths they resolve.

pub mod cache;

pub use cache::FilesystemCache;

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::path::ObjectPath;
use crate::path::validate::GCS_SCHEME;
use crate::storage::ObjectStorage;

/// Options every filesystem handle is opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemConfig {
    /// Size of the chunks used for channel reads and writes
    pub block_size: usize,
    /// Treat names ending in `/` as directories. When off, a trailing `/` is dropped.
    pub use_pseudo_directories: bool,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            block_size: 2 * 1024 * 1024,
            use_pseudo_directories: true,
        }
    }
}

/// An open filesystem bound to one bucket (or, for other providers, one root)
pub trait Filesystem: Send + Sync + fmt::Debug {
    /// URI scheme of the provider serving this filesystem
    fn scheme(&self) -> &str;

    /// Bucket this filesystem serves, if the provider is bucket-organized
    fn bucket(&self) -> Option<&str>;

    /// Whether a trailing `/` marks a directory
    fn pseudo_directories(&self) -> bool {
        true
    }
}

/// A path inside an open filesystem
#[derive(Debug, Clone)]
pub struct NativePath {
    filesystem: Arc<dyn Filesystem>,
    path: ObjectPath,
}

impl NativePath {
    pub fn new(filesystem: Arc<dyn Filesystem>, path: ObjectPath) -> Self {
        let path = if filesystem.pseudo_directories() {
            path
        } else {
            path.without_dir_marker()
        };
        NativePath { filesystem, path }
    }

    /// Resolve a raw path string within `filesystem`
    pub fn within(filesystem: &Arc<dyn Filesystem>, raw: &str) -> Self {
        Self::new(Arc::clone(filesystem), ObjectPath::parse(raw))
    }

    pub fn filesystem(&self) -> &Arc<dyn Filesystem> {
        &self.filesystem
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Resolve `other` against this path on the same filesystem
    pub fn resolve(&self, other: &str) -> Self {
        Self::new(Arc::clone(&self.filesystem), self.path.join(other))
    }

    pub fn parent(&self) -> Option<Self> {
        self.path
            .parent()
            .map(|parent| Self::new(Arc::clone(&self.filesystem), parent))
    }

    /// `<bucket><absolute path>`, with no scheme
    pub fn without_scheme(&self) -> String {
        format!("{}{}", self.filesystem.bucket().unwrap_or_default(), self.path)
    }

    /// `<scheme>://<bucket><absolute path>`
    pub fn uri(&self) -> String {
        format!("{}://{}", self.filesystem.scheme(), self.without_scheme())
    }
}

impl fmt::Display for NativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Builds filesystem handles for the [`FilesystemCache`]
#[async_trait]
pub trait FilesystemFactory: Send + Sync {
    /// Open a filesystem for `bucket`. May be as expensive as opening a remote session.
    async fn open(
        &self,
        bucket: &str,
        storage: Arc<dyn ObjectStorage>,
        project_id: &str,
        config: &FilesystemConfig,
    ) -> Result<Arc<dyn Filesystem>>;
}

/// Filesystem handle for one Cloud Storage bucket
#[derive(Debug)]
pub struct CloudStorageFilesystem {
    bucket: String,
    project_id: String,
    config: FilesystemConfig,
    storage: Arc<dyn ObjectStorage>,
}

impl CloudStorageFilesystem {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn config(&self) -> &FilesystemConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }
}

impl Filesystem for CloudStorageFilesystem {
    fn scheme(&self) -> &str {
        GCS_SCHEME
    }

    fn bucket(&self) -> Option<&str> {
        Some(&self.bucket)
    }

    fn pseudo_directories(&self) -> bool {
        self.config.use_pseudo_directories
    }
}

/// Default factory producing [`CloudStorageFilesystem`] handles
#[derive(Debug, Default, Clone, Copy)]
pub struct CloudStorageFilesystemFactory;

#[async_trait]
impl FilesystemFactory for CloudStorageFilesystemFactory {
    async fn open(
        &self,
        bucket: &str,
        storage: Arc<dyn ObjectStorage>,
        project_id: &str,
        config: &FilesystemConfig,
    ) -> Result<Arc<dyn Filesystem>> {
        if config.block_size == 0 {
            bail!("Block size must be positive for bucket {bucket}");
        }

        tracing::debug!(bucket, project_id, block_size = config.block_size, "opening filesystem");

        Ok(Arc::new(CloudStorageFilesystem {
            bucket: bucket.to_string(),
            project_id: project_id.to_string(),
            config: config.clone(),
            storage,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    async fn open_with(bucket: &str, config: &FilesystemConfig) -> Arc<dyn Filesystem> {
        CloudStorageFilesystemFactory
            .open(bucket, Arc::new(MemoryStorage::new()), "my-project", config)
            .await
            .unwrap()
    }

    async fn open(bucket: &str) -> Arc<dyn Filesystem> {
        open_with(bucket, &FilesystemConfig::default()).await
    }

    #[tokio::test]
    async fn test_native_path_uri() {
        let fs = open("my-bucket").await;
        let path = NativePath::within(&fs, "/some/object.txt");
        assert_eq!(path.uri(), "gs://my-bucket/some/object.txt");
        assert_eq!(path.without_scheme(), "my-bucket/some/object.txt");
    }

    #[tokio::test]
    async fn test_native_path_resolve_keeps_filesystem() {
        let fs = open("my-bucket").await;
        let dir = NativePath::within(&fs, "/dir/");
        let child = dir.resolve("child.txt");
        assert!(Arc::ptr_eq(child.filesystem(), &fs));
        assert_eq!(child.uri(), "gs://my-bucket/dir/child.txt");
        assert_eq!(child.parent().unwrap().uri(), "gs://my-bucket/dir/");
    }

    #[tokio::test]
    async fn test_without_pseudo_directories_trailing_slash_is_dropped() {
        let config = FilesystemConfig {
            use_pseudo_directories: false,
            ..FilesystemConfig::default()
        };
        let fs = open_with("my-bucket", &config).await;
        assert!(!fs.pseudo_directories());

        let dir = NativePath::within(&fs, "/dir/");
        assert!(!dir.path().is_dir());
        assert_eq!(dir.uri(), "gs://my-bucket/dir");
        assert_eq!(dir.path().object_name(), "dir");

        let child = NativePath::within(&fs, "/a/b.txt");
        assert_eq!(child.parent().unwrap().uri(), "gs://my-bucket/a");
        assert_eq!(NativePath::within(&fs, "/").uri(), "gs://my-bucket/");
    }

    #[tokio::test]
    async fn test_pseudo_directories_on_by_default() {
        let fs = open("my-bucket").await;
        assert!(fs.pseudo_directories());
        assert!(NativePath::within(&fs, "/dir/").path().is_dir());
    }

    #[tokio::test]
    async fn test_factory_rejects_zero_block_size() {
        let config = FilesystemConfig {
            block_size: 0,
            ..FilesystemConfig::default()
        };
        let result = CloudStorageFilesystemFactory
            .open("my-bucket", Arc::new(MemoryStorage::new()), "p", &config)
            .await;
        assert!(result.is_err());
    }
}
