//! One fetch cycle: mapping, role plan, role artifacts, reload notification.
//!
//! [`ConfigFetcher::run_cycle`] runs the whole sequence to completion and
//! returns a [`CycleReport`]. The "refresh needed" signal is a value local to
//! the cycle; nothing carries over between cycles except the cache on disk.
//!
//! Per artifact:
//! 1. Current-hour cache file exists: read it, no request is made.
//! 2. Otherwise fetch with retries. On success the body is normalized
//!    through the YAML parser, stored, and compared with the previous
//!    generation.
//! 3. If the fetch is exhausted (or the body or cache write is unusable), the
//!    stable alias is used as last-known-good and nothing is written.

use crate::cache::TimeBucketCache;
use crate::error::{CacheError, CycleError};
use crate::mapping::{FetchPlan, MAPPING, MAPPING_FILE, Mapping, Role};
use siterm_fetcher_config::FetcherConfig;
use siterm_fetcher_http::{
    FetchOutcome, HttpClient, HttpReloadNotifier, ReloadNotifier, ReloadRequest, RetryPolicy,
    RetryingFetcher, UreqClient,
};
use std::path::PathBuf;
use std::sync::Arc;

const CATEGORY: &str = "CONFIG_FETCH";

/// How an artifact's content was obtained this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Current-hour cache hit; no request made.
    Fresh,
    /// Downloaded and stored as a new generation.
    Fetched { changed: bool },
    /// Download failed; last-known-good alias used.
    Fallback,
    /// Download failed and nothing was cached.
    Unavailable,
}

/// A named YAML document as seen in this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub source_url: String,
    /// Parsed content. `Null` when unavailable.
    pub content: serde_yaml_ng::Value,
    pub status: ArtifactStatus,
    /// Cache file the content came from or was written to.
    pub cache_path: Option<PathBuf>,
}

impl Artifact {
    pub fn changed(&self) -> bool {
        matches!(self.status, ArtifactStatus::Fetched { changed: true })
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.status, ArtifactStatus::Unavailable)
    }
}

/// Outcome of the reload step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// No role artifact changed.
    NotNeeded,
    /// A change was seen but reload notifications are disabled.
    Disabled,
    Sent,
    /// The request failed; logged and otherwise ignored.
    Failed(String),
}

/// Everything one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub mapping: Artifact,
    pub role: Role,
    pub artifacts: Vec<Artifact>,
    /// At least one role artifact changed.
    pub refresh_needed: bool,
    pub notification: Notification,
}

impl CycleReport {
    /// URLs actually requested this cycle (fresh cache hits excluded).
    pub fn fetched(&self) -> impl Iterator<Item = &Artifact> {
        std::iter::once(&self.mapping)
            .chain(self.artifacts.iter())
            .filter(|a| !matches!(a.status, ArtifactStatus::Fresh))
    }
}

/// Fetcher wired to the real network.
pub type LiveConfigFetcher = ConfigFetcher<Arc<UreqClient>, HttpReloadNotifier<Arc<UreqClient>>>;

/// Drives fetch cycles against one repository and one cache directory.
pub struct ConfigFetcher<C, N> {
    config: FetcherConfig,
    fetcher: RetryingFetcher<C>,
    cache: TimeBucketCache,
    notifier: N,
}

impl<C, N> std::fmt::Debug for ConfigFetcher<C, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFetcher")
            .field("identity", &self.config.identity)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl LiveConfigFetcher {
    /// Build a fetcher using `ureq` for both downloads and reload requests.
    pub fn from_config(config: FetcherConfig) -> Self {
        let client = Arc::new(UreqClient::new(&config.http));
        let fetcher = RetryingFetcher::new(
            Arc::clone(&client),
            RetryPolicy::from_settings(&config.retry),
        );
        let notifier = HttpReloadNotifier::new(client, config.reload_endpoint());
        let cache = TimeBucketCache::new(config.cache_dir.clone());
        ConfigFetcher::new(config, fetcher, cache, notifier)
    }
}

impl<C: HttpClient, N: ReloadNotifier> ConfigFetcher<C, N> {
    pub fn new(
        config: FetcherConfig,
        fetcher: RetryingFetcher<C>,
        cache: TimeBucketCache,
        notifier: N,
    ) -> Self {
        Self {
            config,
            fetcher,
            cache,
            notifier,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn cache(&self) -> &TimeBucketCache {
        &self.cache
    }

    pub fn mapping_url(&self) -> String {
        format!("{}/{}", self.config.repository_base_url(), MAPPING_FILE)
    }

    /// Run one complete cycle.
    pub fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let mapping_url = self.mapping_url();
        let mapping_artifact = self.fetch_artifact(MAPPING, &mapping_url);
        match mapping_artifact.status {
            ArtifactStatus::Unavailable => {
                crate::debug_error!(
                    CATEGORY,
                    "No mapping available from {} and no cached copy",
                    mapping_url
                );
                return Err(CycleError::MappingUnavailable { url: mapping_url });
            }
            ArtifactStatus::Fetched { changed: true } => {
                crate::debug_info!(
                    CATEGORY,
                    "Got new mapping file. Will re-derive the fetch plan."
                );
            }
            _ => {}
        }

        let identity = self.config.identity.as_str();
        let mapping = Mapping::from_value(&mapping_artifact.content);
        let entry = mapping.entry(identity)?;
        let plan = FetchPlan::for_entry(identity, &entry, &self.config.repository_base_url())?;
        crate::debug_info!(
            CATEGORY,
            "Identity {} maps to role {} under {}",
            identity,
            plan.role,
            plan.base_path
        );

        let mut refresh_needed = false;
        let mut artifacts = Vec::with_capacity(plan.artifacts.len());
        for planned in &plan.artifacts {
            let artifact = self.fetch_artifact(planned.name, &planned.url);
            refresh_needed |= artifact.changed();
            artifacts.push(artifact);
        }

        let notification = if refresh_needed {
            crate::debug_info!(
                CATEGORY,
                "Configuration changed. Will instruct the frontend to reload."
            );
            self.notify_reload()
        } else {
            Notification::NotNeeded
        };

        Ok(CycleReport {
            mapping: mapping_artifact,
            role: plan.role,
            artifacts,
            refresh_needed,
            notification,
        })
    }

    /// Remove every cached generation and alias, then run a fresh cycle.
    pub fn cleanup_and_refetch(&self) -> Result<CycleReport, CycleError> {
        let removed = self.cache.cleanup(&crate::mapping::KNOWN_ARTIFACTS)?;
        crate::debug_info!(
            CATEGORY,
            "Removed {} cached file(s) from {:?}",
            removed,
            self.cache.dir()
        );
        self.run_cycle()
    }

    fn fetch_artifact(&self, name: &str, url: &str) -> Artifact {
        let resolved = self.cache.resolve(name);
        if resolved.is_fresh {
            crate::debug_info!(
                CATEGORY,
                "{} is not yet due for update; using {:?}",
                name,
                resolved.path
            );
            match self.cache.read(&resolved.path) {
                Ok(content) => {
                    return Artifact {
                        name: name.to_string(),
                        source_url: url.to_string(),
                        content,
                        status: ArtifactStatus::Fresh,
                        cache_path: Some(resolved.path),
                    };
                }
                Err(e) => {
                    crate::debug_error!(CATEGORY, "Unreadable cache entry, refetching: {}", e);
                }
            }
        }

        crate::debug_info!(CATEGORY, "Fetching new {} from {}", name, url);
        let body = match self.fetcher.fetch(url) {
            FetchOutcome::Success(body) => body,
            FetchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                crate::debug_error!(
                    CATEGORY,
                    "No update for {} after {} attempt(s): {}",
                    name,
                    attempts,
                    last_error
                );
                return self.last_known_good(name, url);
            }
        };

        match self.store(name, &body) {
            Ok((content, receipt)) => Artifact {
                name: name.to_string(),
                source_url: url.to_string(),
                content,
                status: ArtifactStatus::Fetched {
                    changed: receipt.changed,
                },
                cache_path: Some(receipt.path),
            },
            Err(e) => {
                crate::debug_error!(CATEGORY, "Discarding fetched {}: {}", name, e);
                self.last_known_good(name, url)
            }
        }
    }

    /// Normalize `body` through the YAML parser and write it to the cache.
    fn store(
        &self,
        name: &str,
        body: &str,
    ) -> Result<(serde_yaml_ng::Value, crate::cache::StoreReceipt), CacheError> {
        let path = self.cache.resolve(name).path;
        let content: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(body).map_err(|source| CacheError::Yaml {
                path: path.clone(),
                source,
            })?;
        let normalized = serde_yaml_ng::to_string(&content).map_err(|source| CacheError::Yaml {
            path,
            source,
        })?;
        let receipt = self.cache.store(name, &normalized)?;
        Ok((content, receipt))
    }

    fn last_known_good(&self, name: &str, url: &str) -> Artifact {
        let alias = self.cache.alias_path(name);
        let (content, status, cache_path) = match self.cache.read_alias(name) {
            Ok(Some(content)) => {
                crate::debug_info!(CATEGORY, "Keeping last-known-good {} from {:?}", name, alias);
                (content, ArtifactStatus::Fallback, Some(alias))
            }
            Ok(None) => (serde_yaml_ng::Value::Null, ArtifactStatus::Unavailable, None),
            Err(e) => {
                crate::debug_error!(CATEGORY, "Last-known-good {} unusable: {}", name, e);
                (serde_yaml_ng::Value::Null, ArtifactStatus::Unavailable, None)
            }
        };
        Artifact {
            name: name.to_string(),
            source_url: url.to_string(),
            content,
            status,
            cache_path,
        }
    }

    fn notify_reload(&self) -> Notification {
        if !self.config.reload.enabled {
            crate::debug_info!(CATEGORY, "Reload notifications disabled; skipping");
            return Notification::Disabled;
        }
        let request = ReloadRequest::for_local_host(&self.config.reload.service_name);
        match self.notifier.notify(&request) {
            Ok(()) => Notification::Sent,
            Err(e) => {
                crate::debug_error!(CATEGORY, "Reload request failed: {}", e);
                Notification::Failed(e.to_string())
            }
        }
    }
}
