//! Access policies decide who pays for a request and perform the actual reads
//! and writes on behalf of a [`GcsPath`].

mod requester_pays;
mod standard;

pub use requester_pays::RequesterPaysAccessPolicy;
pub use standard::StandardAccessPolicy;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{PathError, StorageError};
use crate::path::GcsPath;
use crate::storage::{Encoding, ObjectStorage, ObjectStream, OpenOption};

/// Strategy used by every [`GcsPath`] of a builder for its remote I/O
#[async_trait]
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Whether requests against `bucket` are billed to the requester
    async fn requester_pays(&self, bucket: &str) -> Result<bool, PathError>;

    /// Open the object behind `path` for reading
    async fn input_stream(&self, path: &GcsPath) -> Result<ObjectStream, PathError>;

    /// Write `content` to the object behind `path`, returning the written path
    async fn write(
        &self,
        path: &GcsPath,
        content: &str,
        options: &[OpenOption],
        encoding: Encoding,
    ) -> Result<GcsPath, PathError>;
}

/// Which [`AccessPolicy`] a builder is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessPolicySelector {
    /// The bucket owner always pays
    #[default]
    Standard,
    /// Look up each bucket's billing and charge the path's project when required
    RequesterPays,
}

impl AccessPolicySelector {
    pub fn create(&self, storage: Arc<dyn ObjectStorage>) -> Arc<dyn AccessPolicy> {
        match self {
            AccessPolicySelector::Standard => Arc::new(StandardAccessPolicy),
            AccessPolicySelector::RequesterPays => Arc::new(RequesterPaysAccessPolicy::new(storage)),
        }
    }
}

impl FromStr for AccessPolicySelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(AccessPolicySelector::Standard),
            "requester-pays" | "requester_pays" => Ok(AccessPolicySelector::RequesterPays),
            other => Err(format!("unknown access policy: {other}")),
        }
    }
}

/// Read `path`, billing `user_project` when given
async fn read_object(path: &GcsPath, user_project: Option<&str>) -> Result<ObjectStream, PathError> {
    let blob = path.blob_id()?;
    Ok(path.storage().get_object(blob, user_project).await?)
}

/// Write `content` to `path` honouring `options`, billing `user_project` when given
async fn write_object(
    path: &GcsPath,
    content: &str,
    options: &[OpenOption],
    encoding: Encoding,
    user_project: Option<&str>,
) -> Result<GcsPath, PathError> {
    let options = if options.is_empty() {
        &OpenOption::DEFAULT_WRITE[..]
    } else {
        options
    };
    if options.contains(&OpenOption::Append) {
        return Err(PathError::UnsupportedOption(OpenOption::Append));
    }

    let blob = path.blob_id()?;
    let body = encoding.encode(content)?;
    let storage = path.storage();

    let create_new = options.contains(&OpenOption::CreateNew);
    let may_create = create_new || options.contains(&OpenOption::Create);
    if create_new || !may_create {
        let exists = storage.object_exists(blob, user_project).await?;
        if create_new && exists {
            return Err(StorageError::AlreadyExists {
                target: blob.to_string(),
            }
            .into());
        }
        if !may_create && !exists {
            return Err(StorageError::NotFound {
                target: blob.to_string(),
            }
            .into());
        }
    }

    tracing::debug!(%blob, bytes = body.len(), encoding = %encoding, "writing object");
    storage.put_object(blob, body, user_project).await?;
    Ok(path.clone())
}
