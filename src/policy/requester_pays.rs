use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{AccessPolicy, read_object, write_object};
use crate::error::PathError;
use crate::path::GcsPath;
use crate::storage::{Encoding, ObjectStorage, ObjectStream, OpenOption};

/// Bills requests to the path's project whenever the bucket is requester-pays.
///
/// A bucket's billing setting is looked up once and remembered.
#[derive(Debug)]
pub struct RequesterPaysAccessPolicy {
    storage: Arc<dyn ObjectStorage>,
    /// Bucket name -> requester pays
    billing: DashMap<String, bool>,
}

impl RequesterPaysAccessPolicy {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        RequesterPaysAccessPolicy {
            storage,
            billing: DashMap::new(),
        }
    }

    async fn user_project<'a>(&self, path: &'a GcsPath) -> Result<Option<&'a str>, PathError> {
        let pays = self.requester_pays(path.bucket()?).await?;
        Ok(pays.then(|| path.project_id()))
    }
}

#[async_trait]
impl AccessPolicy for RequesterPaysAccessPolicy {
    fn name(&self) -> &str {
        "requester-pays"
    }

    async fn requester_pays(&self, bucket: &str) -> Result<bool, PathError> {
        if let Some(pays) = self.billing.get(bucket) {
            return Ok(*pays);
        }

        let pays = self.storage.requester_pays(bucket).await?;
        tracing::debug!(bucket, requester_pays = pays, "looked up bucket billing");
        self.billing.insert(bucket.to_string(), pays);
        Ok(pays)
    }

    async fn input_stream(&self, path: &GcsPath) -> Result<ObjectStream, PathError> {
        let user_project = self.user_project(path).await?;
        read_object(path, user_project).await
    }

    async fn write(
        &self,
        path: &GcsPath,
        content: &str,
        options: &[OpenOption],
        encoding: Encoding,
    ) -> Result<GcsPath, PathError> {
        let user_project = self.user_project(path).await?;
        write_object(path, content, options, encoding, user_project).await
    }
}
