//! Remote configuration fetcher for SiteRM hosts.
//!
//! Periodically pulls YAML configuration from a git repository's raw-content
//! host, caches it in hour buckets, and asks the site frontend to reload when
//! a role artifact changes.
//!
//! - `cache`: hour-bucketed file cache with stable aliases
//! - `detect`: byte-level change detection between generations
//! - `mapping`: the identity mapping and the role fetch plan
//! - `fetcher`: the per-cycle orchestrator
//! - `runner`: periodic `watch` loop
//! - `cli`: command-line entry point

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cache;
pub mod cli;
pub mod detect;
pub mod error;
pub mod fetcher;
pub mod mapping;
pub mod runner;

pub use cache::TimeBucketCache;
pub use error::{CacheError, CycleError};
pub use fetcher::{
    Artifact, ArtifactStatus, ConfigFetcher, CycleReport, LiveConfigFetcher, Notification,
};
pub use mapping::{FetchPlan, Mapping, Role};
