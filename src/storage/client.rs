use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpRequest;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::Payer;
use bytes::Bytes;
use tokio_util::io::ReaderStream;

use super::transport::{AuthMode, RetrySettings, TransportConfig, create_sdk_client};
use super::{ObjectStorage, ObjectStream};
use crate::error::StorageError;
use crate::path::BlobId;

/// Header naming the project billed for requests against requester-pays buckets
pub const USER_PROJECT_HEADER: &str = "x-goog-user-project";

/// Cloud Storage client speaking the S3-interoperable XML API
#[derive(Debug, Clone)]
pub struct InteropClient {
    client: Client,
}

impl InteropClient {
    /// Create a client for the given credentials and endpoint
    pub async fn new(
        auth: &AuthMode,
        application_name: &str,
        retry: &RetrySettings,
        transport: &TransportConfig,
    ) -> Result<Self> {
        let client = create_sdk_client(auth, application_name, retry, transport).await?;
        Ok(Self::from_client(client))
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: Client) -> Self {
        InteropClient { client }
    }
}

/// Request hook adding the billing project header when one is given
fn with_user_project(user_project: Option<&str>) -> impl Fn(&mut HttpRequest) + Send + Sync + use<> {
    let project = user_project.map(str::to_string);
    move |req: &mut HttpRequest| {
        if let Some(project) = &project {
            req.headers_mut().insert(USER_PROJECT_HEADER, project.clone());
        }
    }
}

#[async_trait]
impl ObjectStorage for InteropClient {
    async fn get_object(
        &self,
        blob: &BlobId,
        user_project: Option<&str>,
    ) -> Result<ObjectStream, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&blob.bucket)
            .key(&blob.name)
            .customize()
            .mutate_request(with_user_project(user_project))
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StorageError::NotFound {
                        target: blob.to_string(),
                    }
                } else {
                    StorageError::request("GetObject", blob.to_string(), err)
                }
            })?;

        let reader = resp.body.into_async_read();
        Ok(Box::pin(ReaderStream::new(reader)))
    }

    async fn put_object(
        &self,
        blob: &BlobId,
        body: Bytes,
        user_project: Option<&str>,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&blob.bucket)
            .key(&blob.name)
            .body(ByteStream::from(body))
            .customize()
            .mutate_request(with_user_project(user_project))
            .send()
            .await
            .map_err(|err| StorageError::request("PutObject", blob.to_string(), err))?;
        Ok(())
    }

    async fn object_exists(
        &self,
        blob: &BlobId,
        user_project: Option<&str>,
    ) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&blob.bucket)
            .key(&blob.name)
            .customize()
            .mutate_request(with_user_project(user_project))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(StorageError::request("HeadObject", blob.to_string(), err)),
        }
    }

    async fn requester_pays(&self, bucket: &str) -> Result<bool, StorageError> {
        let resp = self
            .client
            .get_bucket_request_payment()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| {
                StorageError::request("GetBucketRequestPayment", format!("gs://{bucket}"), err)
            })?;

        Ok(matches!(resp.payer(), Some(Payer::Requester)))
    }
}
