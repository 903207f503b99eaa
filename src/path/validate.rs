//! Syntactic triage of user supplied `gs://` strings.
//!
//! Nothing here talks to Cloud Storage. The goal is to fail fast on typos
//! (wrong scheme, malformed bucket) before a filesystem is ever opened.

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use url::Url;

/// URI scheme of Cloud Storage paths
pub const GCS_SCHEME: &str = "gs";

/// Characters escaped before URI parsing. Everything a URI fragment may not
/// contain, plus `?` so object names keep their question marks instead of
/// turning into a query string.
const UNSAFE_CHARS: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Minimum length of a bucket name accepted as a URI host
const MIN_HOST_BUCKET_LEN: usize = 3;

/// Bucket written right after `gs://` when the URI parser did not recognize a host
/// (underscores, for instance). Alphanumeric bounded, lowercase body, anything after
/// the first `/` is kept unvalidated.
///
/// The body needs at least two characters, so three character names such as
/// `ab_` are rejected here even though Cloud Storage would allow them.
static SOFT_BUCKET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?i:gs)://([a-z0-9][a-z0-9_.\-]{2,}[a-z0-9])(/.*)?$")
        .expect("soft bucket regex must compile")
});

/// Everything after the authority of a `gs://` string, exactly as written
static RAW_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?i:gs)://[^/]*(/.*)?$").expect("raw path regex must compile")
});

/// Result of [`validate_gcs_path`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Both bucket and path within the bucket are known
    ValidFull { bucket: String, path: String },
    /// No scheme at all; only meaningful relative to some other path
    PossiblyValidRelative,
    /// The string cannot be a Cloud Storage path
    Invalid(InvalidPath),
}

/// Reasons a string was rejected, each carrying the offending input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPath {
    #[error("Cloud Storage paths must use the 'gs' scheme: {path_string}")]
    Scheme { path_string: String },

    #[error(
        "'{path_string}' is not a valid Cloud Storage path: expected gs://<bucket>/<object> \
         with a bucket of lowercase letters, digits, '-', '_' or '.'"
    )]
    FullPath { path_string: String },

    #[error("'{path_string}' does not parse as a URI: {cause}")]
    Unparseable {
        path_string: String,
        #[source]
        cause: url::ParseError,
    },
}

impl InvalidPath {
    /// The rejected input, verbatim
    pub fn path_string(&self) -> &str {
        match self {
            InvalidPath::Scheme { path_string }
            | InvalidPath::FullPath { path_string }
            | InvalidPath::Unparseable { path_string, .. } => path_string,
        }
    }

    pub fn error_message(&self) -> String {
        self.to_string()
    }
}

/// Classify a raw string as a full Cloud Storage path, a relative path, or garbage.
pub fn validate_gcs_path(raw: &str) -> ValidationOutcome {
    let escaped = utf8_percent_encode(raw, UNSAFE_CHARS).to_string();

    let uri = match Url::parse(&escaped) {
        Ok(uri) => uri,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return ValidationOutcome::PossiblyValidRelative;
        }
        Err(cause) => {
            return ValidationOutcome::Invalid(InvalidPath::Unparseable {
                path_string: raw.to_string(),
                cause,
            });
        }
    };

    if !uri.scheme().eq_ignore_ascii_case(GCS_SCHEME) {
        return ValidationOutcome::Invalid(InvalidPath::Scheme {
            path_string: raw.to_string(),
        });
    }

    // The parsed path has dot segments removed; the object path is taken from
    // the input instead.
    if let Some(host) = uri.host_str().map(decode).filter(|h| is_server_host(h)) {
        if let Some(captures) = RAW_PATH_PATTERN.captures(raw) {
            return ValidationOutcome::ValidFull {
                bucket: host,
                path: captures
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            };
        }
    }

    match SOFT_BUCKET_PATTERN.captures(raw) {
        Some(captures) => ValidationOutcome::ValidFull {
            bucket: captures[1].to_string(),
            path: captures
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        },
        None => ValidationOutcome::Invalid(InvalidPath::FullPath {
            path_string: raw.to_string(),
        }),
    }
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Whether an authority reads as a server host name: dot separated labels of
/// ASCII alphanumerics and inner dashes.
fn is_server_host(host: &str) -> bool {
    host.len() >= MIN_HOST_BUCKET_LEN
        && host.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
