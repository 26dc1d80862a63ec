//! Error types for the cache and the fetch cycle.

use std::path::PathBuf;

/// Local filesystem or YAML failure in the artifact cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cached artifact {} is not valid YAML: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Conditions that end a fetch cycle before the role artifacts are fetched.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// The mapping could not be fetched and no earlier copy is cached.
    #[error("Mapping unavailable from {url} and no cached copy exists")]
    MappingUnavailable { url: String },

    /// The mapping has no entry for this host's configuration identity.
    #[error("Identity '{identity}' not found in mapping")]
    IdentityNotFound { identity: String },

    /// The identity's entry lacks `type`/`config` or has the wrong shape.
    #[error("Mapping entry for '{identity}' is malformed: {reason}")]
    MalformedEntry { identity: String, reason: String },

    /// The entry names a deployment role this fetcher does not know.
    #[error("Unknown deployment role '{role}' for identity '{identity}'")]
    UnknownRole { identity: String, role: String },

    #[error(transparent)]
    Cache(#[from] CacheError),
}
