//! Store configuration domain models.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{BatchPolicy, ContainerPath, StoreError};

/// Largest object the contents API accepts (100 MiB).
pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 100 * 1024 * 1024;

/// Configuration loaded from `repostore.toml`, with environment overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Where files are stored.
    #[serde(default)]
    pub repository: RepositoryConfig,
    /// Remote API connection settings.
    #[serde(default)]
    pub api: RemoteApiConfig,
    /// Upload limits and batch behavior.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Identity recorded on every commit.
    #[serde(default)]
    pub committer: CommitterConfig,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        self.repository.validate()?;
        self.api.validate()?;
        self.upload.validate()?;
        self.committer.validate()?;
        Ok(())
    }
}

/// Repository coordinates of the container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    /// Path prefix inside the repository holding all files.
    #[serde(default = "default_container")]
    pub container: String,
    /// Branch to read and commit on; the repository default when absent.
    #[serde(default)]
    pub branch: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            container: default_container(),
            branch: None,
        }
    }
}

impl RepositoryConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.owner.trim().is_empty() {
            return Err(StoreError::config_error("repository.owner must not be empty"));
        }
        if self.repo.trim().is_empty() {
            return Err(StoreError::config_error("repository.repo must not be empty"));
        }
        if self.owner.contains('/') || self.repo.contains('/') {
            return Err(StoreError::config_error(
                "repository.owner and repository.repo must not contain '/'",
            ));
        }
        if let Some(branch) = &self.branch
            && branch.trim().is_empty()
        {
            return Err(StoreError::config_error("repository.branch must not be blank"));
        }
        self.container_path()?;
        Ok(())
    }

    pub fn container_path(&self) -> Result<ContainerPath, StoreError> {
        ContainerPath::new(&self.container)
    }
}

fn default_owner() -> String {
    "default-owner".to_string()
}

fn default_repo() -> String {
    "file-storage".to_string()
}

fn default_container() -> String {
    "files".to_string()
}

/// Remote API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteApiConfig {
    /// API root URL.
    #[serde(default = "default_api_url")]
    pub api_url: Url,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum attempts for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between retries in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RemoteApiConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.timeout_secs == 0 {
            return Err(StoreError::config_error("api.timeout_secs must be greater than 0"));
        }
        if self.max_retries == 0 {
            return Err(StoreError::config_error("api.max_retries must be greater than 0"));
        }
        if self.retry_delay_ms == 0 {
            return Err(StoreError::config_error("api.retry_delay_ms must be greater than 0"));
        }
        if self.api_url.cannot_be_a_base() {
            return Err(StoreError::config_error("api.api_url must be an absolute URL"));
        }
        Ok(())
    }
}

fn default_api_url() -> Url {
    Url::parse("https://api.github.com").expect("Default API URL must be valid")
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Per-object size ceiling enforced before any remote call.
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: u64,
    #[serde(default)]
    pub batch_policy: BatchPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { max_object_bytes: default_max_object_bytes(), batch_policy: BatchPolicy::default() }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.max_object_bytes == 0 {
            return Err(StoreError::config_error("upload.max_object_bytes must be greater than 0"));
        }
        Ok(())
    }
}

fn default_max_object_bytes() -> u64 {
    DEFAULT_MAX_OBJECT_BYTES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitterConfig {
    #[serde(default = "default_committer_name")]
    pub name: String,
    #[serde(default = "default_committer_email")]
    pub email: String,
}

impl Default for CommitterConfig {
    fn default() -> Self {
        Self { name: default_committer_name(), email: default_committer_email() }
    }
}

impl CommitterConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::config_error("committer.name must not be empty"));
        }
        if !self.email.contains('@') {
            return Err(StoreError::config_error("committer.email must be an email address"));
        }
        Ok(())
    }
}

fn default_committer_name() -> String {
    "repostore".to_string()
}

fn default_committer_email() -> String {
    "noreply@github.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.repository.repo, "file-storage");
        assert_eq!(config.repository.container, "files");
        assert_eq!(config.api.api_url.as_str(), "https://api.github.com/");
        assert_eq!(config.upload.max_object_bytes, DEFAULT_MAX_OBJECT_BYTES);
        assert_eq!(config.upload.batch_policy, BatchPolicy::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config: StoreConfig = toml::from_str(
            r#"
[repository]
owner = "octo"
branch = "storage"

[upload]
batch_policy = "best-effort"
"#,
        )
        .unwrap();

        assert_eq!(config.repository.owner, "octo");
        assert_eq!(config.repository.repo, "file-storage");
        assert_eq!(config.repository.branch.as_deref(), Some("storage"));
        assert_eq!(config.upload.batch_policy, BatchPolicy::BestEffort);
        assert_eq!(config.api.max_retries, 3);
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = toml::from_str::<StoreConfig>("[repository]\nbucket = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_api_config_invalid_timeout() {
        let config = RemoteApiConfig { timeout_secs: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_api_config_invalid_max_retries() {
        let config = RemoteApiConfig { max_retries: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_api_config_invalid_retry_delay() {
        let config = RemoteApiConfig { retry_delay_ms: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_repository_rejects_bad_container() {
        let config = RepositoryConfig { container: "a/../b".into(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_repository_rejects_slash_in_repo() {
        let config = RepositoryConfig { repo: "a/b".into(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_object_limit() {
        let config = UploadConfig { max_object_bytes: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_committer_requires_email() {
        let config = CommitterConfig { email: "nobody".into(), ..Default::default() };
        assert!(config.validate().is_err());
    }
}
