pub mod builder;
pub mod gcs_path;
pub mod object_path;
pub mod validate;

pub use builder::GcsPathBuilder;
pub use gcs_path::{BlobId, GcsPath, PROVIDER_NAME};
pub use object_path::ObjectPath;
pub use validate::{GCS_SCHEME, InvalidPath, ValidationOutcome, validate_gcs_path};

use async_trait::async_trait;
use std::fmt;

use crate::error::{BuildError, PathError};
use crate::filesystem::NativePath;
use crate::storage::{Encoding, ObjectStream, OpenOption};

/// Provider independent view of a resolved path, so paths from different
/// providers can be handled side by side
#[async_trait]
pub trait StoragePath: Send + Sync + fmt::Debug {
    /// Name of the provider serving this path
    fn name(&self) -> &str;

    /// Full URI of the path, scheme included
    fn as_string(&self) -> String;

    /// The URI without its `scheme://` prefix
    fn without_scheme(&self) -> String;

    /// Same provider context bound to another native path
    fn with_new_native_path(&self, native: NativePath) -> Box<dyn StoragePath>;

    async fn read(&self) -> Result<ObjectStream, PathError>;

    async fn write(
        &self,
        content: &str,
        options: &[OpenOption],
        encoding: Encoding,
    ) -> Result<Box<dyn StoragePath>, PathError>;
}

/// Turns raw strings into [`StoragePath`]s for one provider
#[async_trait]
pub trait PathBuilder: Send + Sync {
    fn name(&self) -> &str;

    async fn build_path(&self, raw: &str) -> Result<Box<dyn StoragePath>, BuildError>;
}
