//! Store configuration loading from `repostore.toml` and the environment.

use std::path::Path;

use url::Url;

use crate::domain::{StoreConfig, StoreError};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "repostore.toml";

const ENV_OWNER: &str = "REPO_OWNER";
const ENV_REPO: &str = "FILE_STORAGE_REPO";
const ENV_CONTAINER: &str = "FILE_STORAGE_PATH";
const ENV_BRANCH: &str = "FILE_STORAGE_BRANCH";
const ENV_API_URL: &str = "GITHUB_API_URL";

/// Load the store configuration.
///
/// An explicit `path` must exist. Without one, `repostore.toml` in the
/// working directory is used when present and defaults otherwise.
/// Environment overrides are applied last, then the result is validated.
pub fn load_config(path: Option<&Path>) -> Result<StoreConfig, StoreError> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(StoreError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            parse_config_content(&std::fs::read_to_string(path)?)?
        }
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                parse_config_content(&std::fs::read_to_string(default_path)?)?
            } else {
                StoreConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Parse TOML config content without validating it.
pub fn parse_config_content(content: &str) -> Result<StoreConfig, StoreError> {
    toml::from_str(content)
        .map_err(|e| StoreError::config_error(format!("Failed to parse config: {}", e)))
}

/// Overlay non-empty environment values onto `config`.
pub fn apply_env_overrides<F>(config: &mut StoreConfig, lookup: F) -> Result<(), StoreError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(owner) = value(ENV_OWNER) {
        config.repository.owner = owner;
    }
    if let Some(repo) = value(ENV_REPO) {
        config.repository.repo = repo;
    }
    if let Some(container) = value(ENV_CONTAINER) {
        config.repository.container = container;
    }
    if let Some(branch) = value(ENV_BRANCH) {
        config.repository.branch = Some(branch);
    }
    if let Some(api_url) = value(ENV_API_URL) {
        config.api.api_url = Url::parse(&api_url).map_err(|e| {
            StoreError::config_error(format!("{} is not a valid URL: {}", ENV_API_URL, e))
        })?;
    }
    Ok(())
}
