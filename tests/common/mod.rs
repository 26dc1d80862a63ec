//! Shared integration test helpers.
//!
//! Include with `mod common;` at the top of each test file. Builds a
//! [`ConfigFetcher`] over a scripted HTTP client, a recording notifier, a
//! fixed clock and a temporary cache directory.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use siterm_config_fetcher::ConfigFetcher;
use siterm_config_fetcher::cache::{FixedClock, TimeBucketCache};
use siterm_fetcher_config::{FetcherConfig, ReloadSettings};
use siterm_fetcher_http::testing::{RecordingNotifier, ScriptedClient};
use siterm_fetcher_http::{RetryPolicy, RetryingFetcher};
use std::sync::Arc;
use tempfile::TempDir;

pub const IDENTITY: &str = "abc123";
pub const BASE: &str = "https://raw.example.org/org/repo/master";
pub const MAPPING_URL: &str = "https://raw.example.org/org/repo/master/mapping.yaml";

pub fn role_url(file: &str) -> String {
    format!("{BASE}/cfg/site1/{file}")
}

pub fn mapping_yaml(role: &str) -> String {
    format!("{IDENTITY}:\n  type: {role}\n  config: /cfg/site1\n")
}

pub type TestFetcher = ConfigFetcher<ScriptedClient, RecordingNotifier>;

/// A fetcher plus handles to everything it talks to.
///
/// The `TempDir` must outlive every cycle run through the fetcher.
pub struct Harness {
    pub client: ScriptedClient,
    pub notifier: RecordingNotifier,
    pub clock: Arc<FixedClock>,
    pub fetcher: TestFetcher,
    pub dir: TempDir,
}

impl Harness {
    pub fn advance_hours(&self, hours: i64) {
        self.clock.advance(chrono::Duration::hours(hours));
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(chrono::Duration::minutes(minutes));
    }
}

pub fn test_config(dir: &TempDir) -> FetcherConfig {
    FetcherConfig {
        git_url: "https://raw.example.org".to_string(),
        git_repo: "org/repo".to_string(),
        git_branch: "master".to_string(),
        identity: IDENTITY.to_string(),
        cache_dir: dir.path().to_path_buf(),
        reload: ReloadSettings {
            frontend_url: "https://fe.example.org".to_string(),
            ..ReloadSettings::default()
        },
        ..FetcherConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(|_| {})
}

/// Build a harness at 2026-10-18 13:05 UTC after letting `tweak` adjust the config.
pub fn harness_with(tweak: impl FnOnce(&mut FetcherConfig)) -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = test_config(&dir);
    tweak(&mut config);

    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 18, 13, 5, 0).unwrap(),
    ));
    let client = ScriptedClient::new();
    let notifier = RecordingNotifier::new();

    let fetcher = RetryingFetcher::new(client.clone(), RetryPolicy::from_settings(&config.retry))
        .with_sleeper(|_| {});
    let cache = TimeBucketCache::with_clock(config.cache_dir.clone(), clock.clone());
    let fetcher = ConfigFetcher::new(config, fetcher, cache, notifier.clone());

    Harness {
        client,
        notifier,
        clock,
        fetcher,
        dir,
    }
}

/// Serve a mapping for `role` and the given role files.
pub fn serve_site(client: &ScriptedClient, role: &str, files: &[(&str, &str)]) {
    client.serve(MAPPING_URL, &mapping_yaml(role));
    for (file, body) in files {
        client.serve(&role_url(file), body);
    }
}

pub fn serve_fe(client: &ScriptedClient, main: &str, auth: &str, auth_re: &str) {
    serve_site(
        client,
        "FE",
        &[("main.yaml", main), ("auth.yaml", auth), ("auth-re.yaml", auth_re)],
    );
}
