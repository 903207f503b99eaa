use async_trait::async_trait;
use std::sync::Arc;

use super::gcs_path::{GcsPath, PROVIDER_NAME};
use super::validate::{ValidationOutcome, validate_gcs_path};
use super::{PathBuilder, StoragePath};
use crate::error::BuildError;
use crate::filesystem::{FilesystemCache, NativePath};
use crate::policy::AccessPolicy;
use crate::storage::ObjectStorage;

/// Builds [`GcsPath`]s for one credential, project and access policy scope.
///
/// Every path built here shares the builder's filesystem cache, so a bucket's
/// filesystem is opened at most once per builder.
#[derive(Clone)]
pub struct GcsPathBuilder {
    storage: Arc<dyn ObjectStorage>,
    project_id: String,
    policy: Arc<dyn AccessPolicy>,
    cache: FilesystemCache,
}

impl GcsPathBuilder {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        project_id: impl Into<String>,
        policy: Arc<dyn AccessPolicy>,
        cache: FilesystemCache,
    ) -> Self {
        GcsPathBuilder {
            storage,
            project_id: project_id.into(),
            policy,
            cache,
        }
    }

    /// Resolve a `gs://bucket/object` string. Waits for the bucket's filesystem
    /// to be opened if this is the first path in that bucket.
    pub async fn build(&self, raw: &str) -> Result<GcsPath, BuildError> {
        match validate_gcs_path(raw) {
            ValidationOutcome::ValidFull { bucket, path } => {
                let filesystem = self
                    .cache
                    .get_or_build(&bucket, &self.storage, &self.project_id)
                    .await?;

                Ok(GcsPath::new(
                    NativePath::within(&filesystem, &path),
                    Arc::clone(&self.storage),
                    self.project_id.clone(),
                    Arc::clone(&self.policy),
                ))
            }
            ValidationOutcome::PossiblyValidRelative => {
                tracing::debug!(path = raw, "rejecting relative path");
                Err(BuildError::RelativePath {
                    path: raw.to_string(),
                })
            }
            ValidationOutcome::Invalid(invalid) => {
                tracing::debug!(path = raw, error = %invalid, "rejecting invalid path");
                Err(invalid.into())
            }
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    pub fn policy(&self) -> &Arc<dyn AccessPolicy> {
        &self.policy
    }

    pub fn cache(&self) -> &FilesystemCache {
        &self.cache
    }
}

#[async_trait]
impl PathBuilder for GcsPathBuilder {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn build_path(&self, raw: &str) -> Result<Box<dyn StoragePath>, BuildError> {
        let path = self.build(raw).await?;
        Ok(Box::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{CloudStorageFilesystemFactory, FilesystemConfig};
    use crate::path::InvalidPath;
    use crate::policy::StandardAccessPolicy;
    use crate::storage::MemoryStorage;

    fn builder() -> GcsPathBuilder {
        GcsPathBuilder::new(
            Arc::new(MemoryStorage::new()),
            "my-project",
            Arc::new(StandardAccessPolicy),
            FilesystemCache::new(
                Arc::new(CloudStorageFilesystemFactory),
                FilesystemConfig::default(),
            ),
        )
    }

    #[tokio::test]
    async fn test_build_full_path() {
        let path = builder().build("gs://my-bucket/some/object.txt").await.unwrap();
        assert_eq!(path.as_string(), "gs://my-bucket/some/object.txt");
        assert_eq!(path.bucket().unwrap(), "my-bucket");
        assert_eq!(path.project_id(), "my-project");
    }

    #[tokio::test]
    async fn test_build_relative_fails() {
        let err = builder().build("relative/thing").await.unwrap_err();
        assert!(matches!(err, BuildError::RelativePath { .. }));
        assert!(err.to_string().contains("relative/thing"));
    }

    #[tokio::test]
    async fn test_build_invalid_surfaces_message_verbatim() {
        let err = builder().build("s3://bucket/x").await.unwrap_err();
        let expected = InvalidPath::Scheme {
            path_string: "s3://bucket/x".to_string(),
        };
        assert_eq!(err.to_string(), expected.error_message());
        assert!(matches!(err, BuildError::Invalid(InvalidPath::Scheme { .. })));
    }

    #[tokio::test]
    async fn test_invalid_path_does_not_touch_cache() {
        let builder = builder();
        let _ = builder.build("gs://a/x").await;
        assert!(builder.cache().is_empty());
    }

    #[tokio::test]
    async fn test_build_through_trait() {
        let builder: Box<dyn PathBuilder> = Box::new(builder());
        assert_eq!(builder.name(), "Google Cloud Storage");
        let path = builder.build_path("gs://my-bucket/x").await.unwrap();
        assert_eq!(path.without_scheme(), "my-bucket/x");
    }
}
