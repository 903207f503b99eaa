use anyhow::{Context, Result};
use aws_config::retry::RetryConfig;
use aws_config::{AppName, BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use std::time::Duration;

/// Cloud Storage XML API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Region string the XML API expects in request signatures
pub const DEFAULT_REGION: &str = "auto";

/// How requests are authenticated
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Whatever the SDK's default credential chain finds
    ApplicationDefault,
    /// Unsigned requests, for public buckets
    Anonymous,
    /// Cloud Storage HMAC key pair
    Hmac {
        access_key_id: String,
        secret: String,
    },
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::ApplicationDefault => f.write_str("ApplicationDefault"),
            AuthMode::Anonymous => f.write_str("Anonymous"),
            AuthMode::Hmac { access_key_id, .. } => f
                .debug_struct("Hmac")
                .field("access_key_id", access_key_id)
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Retry behaviour of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetrySettings {
    fn to_sdk(&self) -> RetryConfig {
        RetryConfig::standard()
            .with_max_attempts(self.max_attempts.max(1))
            .with_initial_backoff(self.initial_backoff)
    }
}

/// Where requests go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub endpoint_url: String,
    pub region: String,
    /// Path-style addressing (`endpoint/bucket/key`) instead of virtual hosts
    pub force_path_style: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            region: DEFAULT_REGION.to_string(),
            force_path_style: true,
        }
    }
}

/// Build an SDK client speaking the Cloud Storage XML API
pub async fn create_sdk_client(
    auth: &AuthMode,
    application_name: &str,
    retry: &RetrySettings,
    transport: &TransportConfig,
) -> Result<Client> {
    let mut sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(transport.region.clone()))
        .retry_config(retry.to_sdk());

    if !application_name.is_empty() {
        let app_name = AppName::new(application_name.to_string())
            .with_context(|| format!("Invalid application name: {application_name}"))?;
        sdk_config = sdk_config.app_name(app_name);
    }

    sdk_config = match auth {
        AuthMode::ApplicationDefault => sdk_config,
        AuthMode::Anonymous => sdk_config.no_credentials(),
        AuthMode::Hmac {
            access_key_id,
            secret,
        } => sdk_config.credentials_provider(Credentials::new(
            access_key_id.clone(),
            secret.clone(),
            None,
            None,
            "gcs-hmac",
        )),
    };

    let base_config = sdk_config.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&base_config)
        .endpoint_url(transport.endpoint_url.clone())
        .force_path_style(transport.force_path_style)
        .build();

    tracing::debug!(
        endpoint = %transport.endpoint_url,
        auth = ?auth,
        max_attempts = retry.max_attempts,
        "created storage transport"
    );

    Ok(Client::from_conf(s3_config))
}
