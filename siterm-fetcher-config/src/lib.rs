//! Configuration system for the SiteRM remote config fetcher.
//!
//! This crate provides configuration loading, saving, validation and default
//! values for the fetcher agent. It includes:
//!
//! - Repository location and configuration identity
//! - Cache directory placement
//! - Retry, HTTP and reload-notification settings

pub mod config;
pub mod defaults;
pub mod error;

pub use config::{FetcherConfig, HttpSettings, ReloadSettings, RetrySettings};
pub use error::ConfigError;
