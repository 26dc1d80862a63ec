//! The mapping artifact and the fetch plan derived from it.
//!
//! `mapping.yaml` maps configuration identities to an entry naming the
//! deployment role and the repository directory holding that host's files:
//!
//! ```yaml
//! abc123:
//!   type: FE
//!   config: T2_US_Caltech/FE
//! ```
//!
//! The plan is rebuilt from the latest mapping every cycle.

use crate::error::CycleError;
use serde::Deserialize;
use std::fmt;

/// Cache name of the mapping artifact.
pub const MAPPING: &str = "mapping";

/// File name of the mapping artifact at the repository root.
pub const MAPPING_FILE: &str = "mapping.yaml";

/// Every artifact name the fetcher can write, used for cache cleanup.
pub const KNOWN_ARTIFACTS: [&str; 5] = [MAPPING, "Agent-main", "FE-main", "FE-auth", "FE-auth-re"];

/// Deployment role of this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Agent,
    Fe,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Agent" => Some(Role::Agent),
            "FE" => Some(Role::Fe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "Agent",
            Role::Fe => "FE",
        }
    }

    /// `(artifact name, file name)` pairs fetched for this role, in order.
    pub fn artifacts(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Role::Agent => &[("Agent-main", "main.yaml")],
            Role::Fe => &[
                ("FE-main", "main.yaml"),
                ("FE-auth", "auth.yaml"),
                ("FE-auth-re", "auth-re.yaml"),
            ],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One identity's entry in the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MappingEntry {
    #[serde(rename = "type")]
    pub role: String,
    /// Repository directory holding this host's files.
    pub config: String,
}

/// Parsed mapping artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping(serde_yaml_ng::Mapping);

impl Mapping {
    /// Anything other than a YAML mapping (including an empty document) is
    /// treated as an empty mapping.
    pub fn from_value(value: &serde_yaml_ng::Value) -> Self {
        match value {
            serde_yaml_ng::Value::Mapping(m) => Self(m.clone()),
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up the entry for `identity`.
    pub fn entry(&self, identity: &str) -> Result<MappingEntry, CycleError> {
        let value = self
            .0
            .get(identity)
            .ok_or_else(|| CycleError::IdentityNotFound {
                identity: identity.to_string(),
            })?;
        serde_yaml_ng::from_value(value.clone()).map_err(|e| CycleError::MalformedEntry {
            identity: identity.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A single artifact the plan requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedArtifact {
    pub name: &'static str,
    pub url: String,
}

/// Role-specific list of artifacts to fetch this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub role: Role,
    pub base_path: String,
    pub artifacts: Vec<PlannedArtifact>,
}

impl FetchPlan {
    /// Build the plan for `identity`'s entry, with URLs under `repository_base`.
    pub fn for_entry(
        identity: &str,
        entry: &MappingEntry,
        repository_base: &str,
    ) -> Result<Self, CycleError> {
        let role = Role::parse(&entry.role).ok_or_else(|| CycleError::UnknownRole {
            identity: identity.to_string(),
            role: entry.role.clone(),
        })?;

        let base = repository_base.trim_end_matches('/');
        let dir = entry.config.trim_matches('/');
        let artifacts = role
            .artifacts()
            .iter()
            .map(|&(name, file)| PlannedArtifact {
                name,
                url: if dir.is_empty() {
                    format!("{base}/{file}")
                } else {
                    format!("{base}/{dir}/{file}")
                },
            })
            .collect();

        Ok(Self {
            role,
            base_path: entry.config.clone(),
            artifacts,
        })
    }
}
