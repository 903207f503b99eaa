pub mod client;
pub mod memory;
pub mod transport;

pub use client::InteropClient;
pub use memory::MemoryStorage;
pub use transport::{AuthMode, RetrySettings, TransportConfig};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use futures::stream::BoxStream;
use std::fmt;
use std::str::FromStr;

use crate::error::{PathError, StorageError};
use crate::path::BlobId;

/// Byte stream returned by object reads
pub type ObjectStream = BoxStream<'static, std::io::Result<Bytes>>;

/// The storage client every path of a builder shares.
///
/// `user_project` names the project billed for the request when a bucket is
/// configured as requester-pays.
#[async_trait]
pub trait ObjectStorage: Send + Sync + fmt::Debug {
    /// Open a streaming read of an object
    async fn get_object(
        &self,
        blob: &BlobId,
        user_project: Option<&str>,
    ) -> Result<ObjectStream, StorageError>;

    /// Replace (or create) an object with `body`
    async fn put_object(
        &self,
        blob: &BlobId,
        body: Bytes,
        user_project: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Check if an object exists
    async fn object_exists(
        &self,
        blob: &BlobId,
        user_project: Option<&str>,
    ) -> Result<bool, StorageError>;

    /// Whether the bucket bills requests to the requester
    async fn requester_pays(&self, bucket: &str) -> Result<bool, StorageError>;
}

/// Drain an [`ObjectStream`] into memory
pub async fn read_to_end(stream: ObjectStream) -> std::io::Result<Bytes> {
    let buf = stream
        .try_fold(BytesMut::new(), |mut buf, chunk| async move {
            buf.extend_from_slice(&chunk);
            Ok(buf)
        })
        .await?;
    Ok(buf.freeze())
}

/// How a write treats an existing object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOption {
    /// Create the object if it is missing
    Create,
    /// Fail if the object already exists
    CreateNew,
    /// Replace existing content
    TruncateExisting,
    /// Add to existing content; objects are immutable so this is rejected
    Append,
}

impl OpenOption {
    /// Options used when the caller does not specify any
    pub const DEFAULT_WRITE: [OpenOption; 2] = [OpenOption::Create, OpenOption::TruncateExisting];
}

/// Character encoding of text written to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Be,
    Utf16Le,
    Iso8859_1,
}

impl Encoding {
    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Iso8859_1 => "ISO-8859-1",
        }
    }

    /// Encode text into the bytes stored in the object
    pub fn encode(&self, content: &str) -> Result<Bytes, PathError> {
        match self {
            Encoding::Utf8 => Ok(Bytes::copy_from_slice(content.as_bytes())),
            Encoding::Utf16Be => Ok(content
                .encode_utf16()
                .flat_map(|unit| unit.to_be_bytes())
                .collect::<Vec<u8>>()
                .into()),
            Encoding::Utf16Le => Ok(content
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect::<Vec<u8>>()
                .into()),
            Encoding::Iso8859_1 => content
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| PathError::Encoding {
                        encoding: self.label(),
                        reason: format!("character {c:?} is outside Latin-1"),
                    })
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Bytes::from),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-16be" => Ok(Encoding::Utf16Be),
            "utf-16le" => Ok(Encoding::Utf16Le),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Encoding::Iso8859_1),
            other => Err(format!("unsupported encoding: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_utf8() {
        assert_eq!(Encoding::Utf8.encode("héllo").unwrap().as_ref(), "héllo".as_bytes());
    }

    #[test]
    fn test_encode_utf16() {
        assert_eq!(Encoding::Utf16Be.encode("A").unwrap().as_ref(), &[0x00, 0x41]);
        assert_eq!(Encoding::Utf16Le.encode("A").unwrap().as_ref(), &[0x41, 0x00]);
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(Encoding::Iso8859_1.encode("é").unwrap().as_ref(), &[0xE9]);

        let err = Encoding::Iso8859_1.encode("€").unwrap_err();
        assert!(matches!(err, PathError::Encoding { encoding: "ISO-8859-1", .. }));
    }

    #[test]
    fn test_parse_encoding() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("utf_16le".parse::<Encoding>().unwrap(), Encoding::Utf16Le);
        assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::Iso8859_1);
        assert!("ebcdic".parse::<Encoding>().is_err());
    }

    #[tokio::test]
    async fn test_read_to_end_concatenates_chunks() {
        let chunks: Vec<std::io::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let stream: ObjectStream = Box::pin(futures::stream::iter(chunks));
        assert_eq!(read_to_end(stream).await.unwrap().as_ref(), b"hello world");
    }
}
