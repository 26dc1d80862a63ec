//! Default values referenced by `#[serde(default = ...)]` attributes.

use std::path::PathBuf;

// ── Repository ─────────────────────────────────────────────────────────────

pub fn git_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

pub fn git_branch() -> String {
    "master".to_string()
}

// ── Cache ──────────────────────────────────────────────────────────────────

/// Cached artifacts live in the system temp directory unless configured.
pub fn cache_dir() -> PathBuf {
    std::env::temp_dir()
}

pub fn refresh_interval_secs() -> u64 {
    3600
}

// ── Retry ──────────────────────────────────────────────────────────────────

pub fn retry_max_attempts() -> u32 {
    3
}

pub fn retry_delay_secs() -> u64 {
    5
}

// ── HTTP ───────────────────────────────────────────────────────────────────

pub fn http_timeout_secs() -> u64 {
    30
}

pub fn http_max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

// ── Reload ─────────────────────────────────────────────────────────────────

pub fn reload_service_name() -> String {
    "ALL".to_string()
}

pub fn bool_true() -> bool {
    true
}
