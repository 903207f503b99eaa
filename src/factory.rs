use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::Arc;

use crate::filesystem::{
    CloudStorageFilesystemFactory, FilesystemCache, FilesystemConfig, FilesystemFactory,
};
use crate::path::GcsPathBuilder;
use crate::policy::AccessPolicySelector;
use crate::storage::{AuthMode, InteropClient, ObjectStorage, RetrySettings, TransportConfig};

/// Option naming the project that owns (and pays for) the paths of a builder
pub const PROJECT_OPTION: &str = "google_project";

/// Creates [`GcsPathBuilder`]s that share credentials and transport settings.
///
/// Each call to [`build`](Self::build) produces an independent builder with its
/// own filesystem cache.
#[derive(Debug, Clone)]
pub struct GcsPathBuilderFactory {
    pub auth: AuthMode,
    pub application_name: String,
    pub retry: RetrySettings,
    pub filesystem: FilesystemConfig,
    pub transport: TransportConfig,
    pub default_project: Option<String>,
    pub policy: AccessPolicySelector,
}

impl Default for GcsPathBuilderFactory {
    fn default() -> Self {
        Self {
            auth: AuthMode::ApplicationDefault,
            application_name: env!("CARGO_PKG_NAME").to_string(),
            retry: RetrySettings::default(),
            filesystem: FilesystemConfig::default(),
            transport: TransportConfig::default(),
            default_project: None,
            policy: AccessPolicySelector::default(),
        }
    }
}

impl GcsPathBuilderFactory {
    /// Create a builder backed by a Cloud Storage client
    pub async fn build(&self, options: &HashMap<String, String>) -> Result<GcsPathBuilder> {
        let project_id = self.project_id(options)?;
        let client = InteropClient::new(
            &self.auth,
            &self.application_name,
            &self.retry,
            &self.transport,
        )
        .await?;
        Ok(self.build_with(
            Arc::new(client),
            project_id,
            Arc::new(CloudStorageFilesystemFactory),
        ))
    }

    /// Create a builder around an existing storage client and filesystem factory
    pub fn build_with(
        &self,
        storage: Arc<dyn ObjectStorage>,
        project_id: String,
        filesystems: Arc<dyn FilesystemFactory>,
    ) -> GcsPathBuilder {
        let policy = self.policy.create(Arc::clone(&storage));
        tracing::debug!(
            project_id = %project_id,
            policy = policy.name(),
            "created path builder"
        );
        GcsPathBuilder::new(
            storage,
            project_id,
            policy,
            FilesystemCache::new(filesystems, self.filesystem.clone()),
        )
    }

    /// Project named in `options`, falling back to the default project
    pub fn project_id(&self, options: &HashMap<String, String>) -> Result<String> {
        let project = options
            .get(PROJECT_OPTION)
            .or(self.default_project.as_ref())
            .map(|p| p.trim())
            .unwrap_or_default();

        if project.is_empty() {
            bail!("No project configured: set '{PROJECT_OPTION}' or a default project");
        }
        if !project
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ':' | '_'))
        {
            bail!("Invalid project id: {project}");
        }
        Ok(project.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn factory(default_project: Option<&str>) -> GcsPathBuilderFactory {
        GcsPathBuilderFactory {
            default_project: default_project.map(str::to_string),
            ..GcsPathBuilderFactory::default()
        }
    }

    #[test]
    fn test_project_option_wins_over_default() {
        let options = HashMap::from([(PROJECT_OPTION.to_string(), "workflow-project".to_string())]);
        let project = factory(Some("default-project")).project_id(&options).unwrap();
        assert_eq!(project, "workflow-project");
    }

    #[test]
    fn test_default_project_used_without_option() {
        let project = factory(Some("default-project"))
            .project_id(&HashMap::new())
            .unwrap();
        assert_eq!(project, "default-project");
    }

    #[test]
    fn test_missing_or_bad_project_is_rejected() {
        assert!(factory(None).project_id(&HashMap::new()).is_err());

        let options = HashMap::from([(PROJECT_OPTION.to_string(), "bad project\n".to_string())]);
        assert!(factory(None).project_id(&options).is_err());
    }

    #[tokio::test]
    async fn test_build_with_selects_policy() {
        let factory = GcsPathBuilderFactory {
            policy: AccessPolicySelector::RequesterPays,
            ..factory(Some("p"))
        };
        let builder = factory.build_with(
            Arc::new(MemoryStorage::new()),
            "p".to_string(),
            Arc::new(CloudStorageFilesystemFactory),
        );
        assert_eq!(builder.policy().name(), "requester-pays");
        assert_eq!(builder.project_id(), "p");
        assert!(builder.cache().is_empty());
    }

    #[tokio::test]
    async fn test_build_with_hmac_needs_no_network() {
        let factory = GcsPathBuilderFactory {
            auth: AuthMode::Hmac {
                access_key_id: "GOOG1EXAMPLE".to_string(),
                secret: "secret".to_string(),
            },
            ..factory(Some("p"))
        };
        let builder = factory.build(&HashMap::new()).await.unwrap();
        let path = builder.build("gs://my-bucket/x").await.unwrap();
        assert_eq!(path.as_string(), "gs://my-bucket/x");
    }
}
