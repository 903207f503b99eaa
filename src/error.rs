use std::sync::Arc;

use crate::path::validate::InvalidPath;
use crate::storage::OpenOption;

/// Boxed error produced by a storage transport
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error shared between every caller waiting on the same filesystem construction
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Failure to turn a string into a [`GcsPath`](crate::path::GcsPath)
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Invalid(#[from] InvalidPath),

    #[error("'{path}' is not an absolute gs:// path; relative paths cannot be built")]
    RelativePath { path: String },

    #[error("failed to open a filesystem for bucket '{bucket}': {source}")]
    Construction {
        bucket: String,
        #[source]
        source: SharedError,
    },
}

impl BuildError {
    /// Construction failures are never cached, so trying again may succeed.
    /// Everything else is a problem with the input string.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BuildError::Construction { .. })
    }

    /// The input string that was rejected, when the failure is about the input
    pub fn path_string(&self) -> Option<&str> {
        match self {
            BuildError::Invalid(invalid) => Some(invalid.path_string()),
            BuildError::RelativePath { path } => Some(path),
            BuildError::Construction { .. } => None,
        }
    }
}

/// Failure of an operation on an already built path
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// The native path is served by another provider. This is a bug in the caller that
    /// handed us the native path, never a user input problem.
    #[error("internal error: native path '{path}' is served by the '{scheme}' provider, not Cloud Storage")]
    ProviderMismatch { path: String, scheme: String },

    #[error("open option {0:?} is not supported for Cloud Storage objects")]
    UnsupportedOption(OpenOption),

    #[error("content cannot be encoded as {encoding}: {reason}")]
    Encoding {
        encoding: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PathError {
    /// Whether this error signals a programming defect rather than an I/O or input problem
    pub fn is_internal(&self) -> bool {
        matches!(self, PathError::ProviderMismatch { .. })
    }
}

/// Failure reported by an [`ObjectStorage`](crate::storage::ObjectStorage) implementation
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {target}")]
    NotFound { target: String },

    #[error("object already exists: {target}")]
    AlreadyExists { target: String },

    #[error("{operation} failed for {target}")]
    Request {
        operation: &'static str,
        target: String,
        #[source]
        source: BoxError,
    },
}

impl StorageError {
    pub fn request(
        operation: &'static str,
        target: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        StorageError::Request {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_construction_is_retryable() {
        let construction = BuildError::Construction {
            bucket: "my-bucket".to_string(),
            source: Arc::new(std::io::Error::other("connection reset")),
        };
        assert!(construction.is_retryable());
        assert_eq!(construction.path_string(), None);

        let relative = BuildError::RelativePath {
            path: "a/b".to_string(),
        };
        assert!(!relative.is_retryable());
        assert_eq!(relative.path_string(), Some("a/b"));
    }

    #[test]
    fn test_construction_message_includes_cause() {
        let err = BuildError::Construction {
            bucket: "my-bucket".to_string(),
            source: Arc::new(std::io::Error::other("connection reset")),
        };
        let message = err.to_string();
        assert!(message.contains("my-bucket"));
        assert!(message.contains("connection reset"));
    }

    #[test]
    fn test_provider_mismatch_is_internal() {
        let err = PathError::ProviderMismatch {
            path: "/tmp/x".to_string(),
            scheme: "file".to_string(),
        };
        assert!(err.is_internal());
        assert!(err.to_string().starts_with("internal error"));

        let err = PathError::UnsupportedOption(OpenOption::Append);
        assert!(!err.is_internal());
    }
}
