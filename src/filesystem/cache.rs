use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;

use super::{Filesystem, FilesystemConfig, FilesystemFactory};
use crate::error::{BoxError, BuildError, SharedError};
use crate::storage::ObjectStorage;

/// One construction attempt, awaited by every caller asking for the same bucket
type PendingFilesystem = Shared<BoxFuture<'static, Result<Arc<dyn Filesystem>, SharedError>>>;

/// Cache of open filesystems, one per bucket.
///
/// Concurrent requests for a bucket share a single construction. Successful
/// handles are kept for the lifetime of the cache; failed constructions are
/// forgotten so the next request tries again.
pub struct FilesystemCache {
    /// Bucket name -> construction (pending or finished)
    entries: Arc<DashMap<String, PendingFilesystem>>,
    factory: Arc<dyn FilesystemFactory>,
    config: FilesystemConfig,
}

impl FilesystemCache {
    pub fn new(factory: Arc<dyn FilesystemFactory>, config: FilesystemConfig) -> Self {
        FilesystemCache {
            entries: Arc::new(DashMap::new()),
            factory,
            config,
        }
    }

    pub fn config(&self) -> &FilesystemConfig {
        &self.config
    }

    /// Get the filesystem for `bucket`, opening it through the factory if needed
    pub async fn get_or_build(
        &self,
        bucket: &str,
        storage: &Arc<dyn ObjectStorage>,
        project_id: &str,
    ) -> Result<Arc<dyn Filesystem>, BuildError> {
        // The shard lock is released at the end of this match, before any await
        let pending = match self.entries.entry(bucket.to_string()) {
            Entry::Occupied(entry) => {
                tracing::trace!(bucket, "filesystem cache hit");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                tracing::debug!(bucket, "filesystem cache miss");
                let pending = self.open(bucket, storage, project_id);
                entry.insert(pending.clone());
                pending
            }
        };

        match pending.clone().await {
            Ok(filesystem) => Ok(filesystem),
            Err(source) => {
                // Only drop our own attempt; a newer one may already be in flight
                self.entries
                    .remove_if(bucket, |_, cached| cached.ptr_eq(&pending));
                tracing::warn!(bucket, error = %source, "failed to open filesystem");
                Err(BuildError::Construction {
                    bucket: bucket.to_string(),
                    source,
                })
            }
        }
    }

    fn open(
        &self,
        bucket: &str,
        storage: &Arc<dyn ObjectStorage>,
        project_id: &str,
    ) -> PendingFilesystem {
        let factory = Arc::clone(&self.factory);
        let storage = Arc::clone(storage);
        let config = self.config.clone();
        let bucket = bucket.to_string();
        let project_id = project_id.to_string();

        async move {
            factory
                .open(&bucket, storage, &project_id, &config)
                .await
                .map_err(|err| SharedError::from(BoxError::from(err)))
        }
        .boxed()
        .shared()
    }

    /// Whether a construction for `bucket` is cached or in flight
    pub fn contains(&self, bucket: &str) -> bool {
        self.entries.contains_key(bucket)
    }

    /// Get number of cached buckets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for FilesystemCache {
    fn clone(&self) -> Self {
        FilesystemCache {
            entries: Arc::clone(&self.entries),
            factory: Arc::clone(&self.factory),
            config: self.config.clone(),
        }
    }
}
