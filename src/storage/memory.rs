use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ObjectStorage, ObjectStream};
use crate::error::StorageError;
use crate::path::BlobId;

/// In-process object store.
///
/// Requester-pays buckets reject requests that do not name a billing project,
/// the same way Cloud Storage does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: DashMap<BlobId, Bytes>,
    requester_pays: DashSet<String>,
    /// Number of billing lookups, for callers checking memoization
    billing_lookups: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a bucket as requester-pays
    pub fn set_requester_pays(&self, bucket: &str) {
        self.requester_pays.insert(bucket.to_string());
    }

    /// Seed an object
    pub fn insert(&self, blob: BlobId, body: impl Into<Bytes>) {
        self.objects.insert(blob, body.into());
    }

    /// Get a stored object's contents
    pub fn get(&self, blob: &BlobId) -> Option<Bytes> {
        self.objects.get(blob).map(|entry| entry.value().clone())
    }

    pub fn billing_lookups(&self) -> usize {
        self.billing_lookups.load(Ordering::Relaxed)
    }

    fn check_billing(&self, blob: &BlobId, user_project: Option<&str>) -> Result<(), StorageError> {
        if self.requester_pays.contains(&blob.bucket) && user_project.is_none() {
            return Err(StorageError::request(
                "request",
                blob.to_string(),
                format!("bucket {} is requester-pays and no user project was given", blob.bucket),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn get_object(
        &self,
        blob: &BlobId,
        user_project: Option<&str>,
    ) -> Result<ObjectStream, StorageError> {
        self.check_billing(blob, user_project)?;
        let body = self.get(blob).ok_or_else(|| StorageError::NotFound {
            target: blob.to_string(),
        })?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(body)
        })))
    }

    async fn put_object(
        &self,
        blob: &BlobId,
        body: Bytes,
        user_project: Option<&str>,
    ) -> Result<(), StorageError> {
        self.check_billing(blob, user_project)?;
        self.objects.insert(blob.clone(), body);
        Ok(())
    }

    async fn object_exists(
        &self,
        blob: &BlobId,
        user_project: Option<&str>,
    ) -> Result<bool, StorageError> {
        self.check_billing(blob, user_project)?;
        Ok(self.objects.contains_key(blob))
    }

    async fn requester_pays(&self, bucket: &str) -> Result<bool, StorageError> {
        self.billing_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.requester_pays.contains(bucket))
    }
}
