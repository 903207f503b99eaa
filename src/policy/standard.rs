use async_trait::async_trait;

use super::{AccessPolicy, read_object, write_object};
use crate::error::PathError;
use crate::path::GcsPath;
use crate::storage::{Encoding, ObjectStream, OpenOption};

/// Bucket owner pays for everything; no billing project is ever sent
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardAccessPolicy;

#[async_trait]
impl AccessPolicy for StandardAccessPolicy {
    fn name(&self) -> &str {
        "standard"
    }

    async fn requester_pays(&self, _bucket: &str) -> Result<bool, PathError> {
        Ok(false)
    }

    async fn input_stream(&self, path: &GcsPath) -> Result<ObjectStream, PathError> {
        read_object(path, None).await
    }

    async fn write(
        &self,
        path: &GcsPath,
        content: &str,
        options: &[OpenOption],
        encoding: Encoding,
    ) -> Result<GcsPath, PathError> {
        write_object(path, content, options, encoding, None).await
    }
}
