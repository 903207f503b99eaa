use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

use super::StoragePath;
use super::validate::GCS_SCHEME;
use crate::error::PathError;
use crate::filesystem::NativePath;
use crate::policy::AccessPolicy;
use crate::storage::{Encoding, ObjectStorage, ObjectStream, OpenOption};

/// Human readable name of the provider
pub const PROVIDER_NAME: &str = "Google Cloud Storage";

/// Identifies one object: bucket plus object name (no leading slash)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobId {
    pub bucket: String,
    pub name: String,
}

impl BlobId {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        BlobId {
            bucket: bucket.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{GCS_SCHEME}://{}/{}", self.bucket, self.name)
    }
}

/// A resolved Cloud Storage path.
///
/// Carries the storage client, project and access policy of the builder that
/// produced it. Paths derived from this one (children, parents, any new native
/// path) copy that context instead of going back to a builder.
#[derive(Debug, Clone)]
pub struct GcsPath {
    native: NativePath,
    storage: Arc<dyn ObjectStorage>,
    project_id: String,
    policy: Arc<dyn AccessPolicy>,
    /// Computed on first use
    blob_id: OnceCell<BlobId>,
}

impl GcsPath {
    pub fn new(
        native: NativePath,
        storage: Arc<dyn ObjectStorage>,
        project_id: String,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        GcsPath {
            native,
            storage,
            project_id,
            policy,
            blob_id: OnceCell::new(),
        }
    }

    /// `gs://<bucket>/<path without leading slash>`
    pub fn as_string(&self) -> String {
        self.native.uri()
    }

    /// `<bucket>/<path>`
    pub fn without_scheme(&self) -> String {
        self.native.without_scheme()
    }

    pub fn native_path(&self) -> &NativePath {
        &self.native
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn policy(&self) -> &Arc<dyn AccessPolicy> {
        &self.policy
    }

    /// Same storage client, project and policy, different native path
    pub fn with_new_native_path(&self, native: NativePath) -> GcsPath {
        GcsPath::new(
            native,
            Arc::clone(&self.storage),
            self.project_id.clone(),
            Arc::clone(&self.policy),
        )
    }

    /// Resolve a child (or any relative path) against this one
    pub fn resolve(&self, other: &str) -> GcsPath {
        self.with_new_native_path(self.native.resolve(other))
    }

    pub fn parent(&self) -> Option<GcsPath> {
        self.native
            .parent()
            .map(|parent| self.with_new_native_path(parent))
    }

    pub fn file_name(&self) -> Option<&str> {
        self.native.path().file_name()
    }

    /// Bucket of this path. Fails if the native path is not served by Cloud Storage.
    pub fn bucket(&self) -> Result<&str, PathError> {
        let filesystem = self.native.filesystem();
        match filesystem.bucket() {
            Some(bucket) if filesystem.scheme() == GCS_SCHEME => Ok(bucket),
            _ => Err(PathError::ProviderMismatch {
                path: self.native.uri(),
                scheme: filesystem.scheme().to_string(),
            }),
        }
    }

    /// Object identifier, derived once and reused
    pub fn blob_id(&self) -> Result<&BlobId, PathError> {
        self.blob_id.get_or_try_init(|| {
            let bucket = self.bucket()?;
            Ok(BlobId::new(bucket, self.native.path().object_name()))
        })
    }

    /// Open the object for reading through the access policy
    pub async fn read(&self) -> Result<ObjectStream, PathError> {
        self.policy.input_stream(self).await
    }

    /// Write text to the object through the access policy. Returns the path
    /// that was written.
    pub async fn write(
        &self,
        content: &str,
        options: &[OpenOption],
        encoding: Encoding,
    ) -> Result<GcsPath, PathError> {
        self.policy.write(self, content, options, encoding).await
    }

    /// Whether requests against this path's bucket are billed to the requester
    pub async fn requester_pays(&self) -> Result<bool, PathError> {
        self.policy.requester_pays(self.bucket()?).await
    }
}

impl fmt::Display for GcsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

#[async_trait]
impl StoragePath for GcsPath {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn as_string(&self) -> String {
        GcsPath::as_string(self)
    }

    fn without_scheme(&self) -> String {
        GcsPath::without_scheme(self)
    }

    fn with_new_native_path(&self, native: NativePath) -> Box<dyn StoragePath> {
        Box::new(GcsPath::with_new_native_path(self, native))
    }

    async fn read(&self) -> Result<ObjectStream, PathError> {
        GcsPath::read(self).await
    }

    async fn write(
        &self,
        content: &str,
        options: &[OpenOption],
        encoding: Encoding,
    ) -> Result<Box<dyn StoragePath>, PathError> {
        let written = GcsPath::write(self, content, options, encoding).await?;
        Ok(Box::new(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{
        CloudStorageFilesystemFactory, Filesystem, FilesystemConfig, FilesystemFactory,
    };
    use crate::path::ObjectPath;
    use crate::policy::StandardAccessPolicy;
    use crate::storage::MemoryStorage;

    #[derive(Debug)]
    struct LocalFilesystem;

    impl Filesystem for LocalFilesystem {
        fn scheme(&self) -> &str {
            "file"
        }

        fn bucket(&self) -> Option<&str> {
            None
        }
    }

    async fn gcs_path(bucket: &str, path: &str) -> GcsPath {
        let storage: Arc<dyn ObjectStorage> = Arc::new(MemoryStorage::new());
        let fs = CloudStorageFilesystemFactory
            .open(bucket, Arc::clone(&storage), "my-project", &FilesystemConfig::default())
            .await
            .unwrap();
        GcsPath::new(
            NativePath::within(&fs, path),
            storage,
            "my-project".to_string(),
            Arc::new(StandardAccessPolicy),
        )
    }

    #[tokio::test]
    async fn test_string_forms() {
        let path = gcs_path("my-bucket", "/some/object.txt").await;
        assert_eq!(path.as_string(), "gs://my-bucket/some/object.txt");
        assert_eq!(path.without_scheme(), "my-bucket/some/object.txt");
        assert_eq!(path.to_string(), path.as_string());
        assert_eq!(StoragePath::name(&path), "Google Cloud Storage");
    }

    #[tokio::test]
    async fn test_blob_id_is_memoized() {
        let path = gcs_path("my-bucket", "/a/./b/../c.txt").await;
        let first = path.blob_id().unwrap();
        assert_eq!(first, &BlobId::new("my-bucket", "a/c.txt"));
        let second = path.blob_id().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[tokio::test]
    async fn test_derived_paths_copy_context() {
        let path = gcs_path("my-bucket", "/dir/").await;
        let child = path.resolve("file.txt");

        assert_eq!(child.as_string(), "gs://my-bucket/dir/file.txt");
        assert_eq!(child.file_name(), Some("file.txt"));
        assert!(Arc::ptr_eq(child.storage(), path.storage()));
        assert!(Arc::ptr_eq(child.policy(), path.policy()));
        assert_eq!(child.project_id(), "my-project");

        let parent = child.parent().unwrap();
        assert_eq!(parent.as_string(), "gs://my-bucket/dir/");
    }

    #[tokio::test]
    async fn test_foreign_native_path_is_internal_error() {
        let path = gcs_path("my-bucket", "/x").await;
        let local: Arc<dyn Filesystem> = Arc::new(LocalFilesystem);
        let foreign = path.with_new_native_path(NativePath::new(local, ObjectPath::parse("/tmp/x")));

        let err = foreign.blob_id().unwrap_err();
        assert!(err.is_internal());
        assert!(matches!(err, PathError::ProviderMismatch { ref scheme, .. } if scheme == "file"));

        let err = foreign.requester_pays().await.unwrap_err();
        assert!(err.is_internal());
    }
}
