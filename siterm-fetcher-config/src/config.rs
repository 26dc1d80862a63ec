//! The fetcher configuration struct, its persistence and validation.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write)
//! - `default_path` (XDG-style location under the user config dir)
//! - `validate` (required fields and sane bounds)
//! - URL helpers for the repository base and the reload endpoint

use crate::defaults;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path appended to `reload.frontend_url` to reach the service-action endpoint.
pub const RELOAD_ENDPOINT_PATH: &str = "/sitefe/json/frontend/serviceaction";

/// Retry settings applied to every artifact fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per fetch, including the first one.
    #[serde(default = "defaults::retry_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in seconds.
    #[serde(default = "defaults::retry_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: defaults::retry_max_attempts(),
            delay_secs: defaults::retry_delay_secs(),
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Global per-request timeout, in seconds.
    #[serde(default = "defaults::http_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum accepted response body size.
    #[serde(default = "defaults::http_max_body_bytes")]
    pub max_body_bytes: u64,

    /// Permit plain `http://` URLs. HTTPS is required otherwise.
    #[serde(default)]
    pub allow_http: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::http_timeout_secs(),
            max_body_bytes: defaults::http_max_body_bytes(),
            allow_http: false,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Reload notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadSettings {
    /// Send a reload request when a role artifact changes.
    #[serde(default = "defaults::bool_true")]
    pub enabled: bool,

    /// Base URL of the site frontend, e.g. `https://sitefe.example.org:8443`.
    #[serde(default)]
    pub frontend_url: String,

    /// Service name placed in the reload payload.
    #[serde(default = "defaults::reload_service_name")]
    pub service_name: String,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            frontend_url: String::new(),
            service_name: defaults::reload_service_name(),
        }
    }
}

/// Top-level configuration for the fetcher agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Raw-content host of the configuration repository.
    #[serde(default = "defaults::git_url")]
    pub git_url: String,

    /// Repository path on that host, e.g. `sdn-sense/rm-configs`.
    #[serde(default)]
    pub git_repo: String,

    /// Branch to read from.
    #[serde(default = "defaults::git_branch")]
    pub git_branch: String,

    /// Key of this host's entry in `mapping.yaml`.
    #[serde(default)]
    pub identity: String,

    /// Directory holding hour-bucketed cache files and stable aliases.
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: PathBuf,

    /// Period of the `watch` runner, in seconds.
    #[serde(default = "defaults::refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub reload: ReloadSettings,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            git_url: defaults::git_url(),
            git_repo: String::new(),
            git_branch: defaults::git_branch(),
            identity: String::new(),
            cache_dir: defaults::cache_dir(),
            refresh_interval_secs: defaults::refresh_interval_secs(),
            retry: RetrySettings::default(),
            http: HttpSettings::default(),
            reload: ReloadSettings::default(),
        }
    }
}

impl FetcherConfig {
    /// Default config location: `~/.config/siterm/config-fetcher.yaml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("siterm")
            .join("config-fetcher.yaml")
    }

    /// Load and validate configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        log::info!("Loading fetcher config from {:?}", path);

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: FetcherConfig = serde_yaml_ng::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(|e| ConfigError::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| ConfigError::io(path, e))?;
        Ok(())
    }

    /// Check required fields and bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.trim().is_empty() {
            return Err(ConfigError::Validation(
                "`identity` must name this host's entry in mapping.yaml".to_string(),
            ));
        }
        if self.git_url.trim().is_empty() || self.git_repo.trim().is_empty() {
            return Err(ConfigError::Validation(
                "`git_url` and `git_repo` must both be set".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "`retry.max_attempts` must be at least 1".to_string(),
            ));
        }
        if self.reload.enabled && self.reload.frontend_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "`reload.frontend_url` is required while `reload.enabled` is true".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "`refresh_interval_secs` must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `{git_url}/{git_repo}/{git_branch}` with redundant slashes removed.
    pub fn repository_base_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.git_url.trim_end_matches('/'),
            self.git_repo.trim_matches('/'),
            self.git_branch.trim_matches('/')
        )
    }

    /// Full URL of the frontend's service-action endpoint.
    pub fn reload_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.reload.frontend_url.trim_end_matches('/'),
            RELOAD_ENDPOINT_PATH
        )
    }
}
