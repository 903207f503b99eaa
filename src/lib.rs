//! Resolve `gs://bucket/object` strings into Cloud Storage paths.
//!
//! A [`GcsPathBuilder`] validates the string, opens (or reuses) the bucket's
//! filesystem through its [`FilesystemCache`], and hands back a [`GcsPath`]
//! whose reads and writes go through an injected [`AccessPolicy`].

pub mod error;
pub mod factory;
pub mod filesystem;
pub mod path;
pub mod policy;
pub mod storage;

pub use error::{BuildError, PathError, StorageError};
pub use factory::GcsPathBuilderFactory;
pub use filesystem::{FilesystemCache, FilesystemConfig, FilesystemFactory, NativePath};
pub use path::{BlobId, GcsPath, GcsPathBuilder, StoragePath, ValidationOutcome, validate_gcs_path};
pub use policy::{AccessPolicy, AccessPolicySelector};
pub use storage::{Encoding, ObjectStorage, OpenOption};
