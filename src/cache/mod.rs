//! Hour-bucketed on-disk cache for fetched artifacts.
//!
//! Layout inside the cache directory:
//!
//! - `{YYYY-MM-DD-HH}-{name}.yaml`: one generation per artifact, keyed by
//!   the hour bucket it was fetched in
//! - `siterm-link-{name}.yaml`: stable alias holding the latest generation,
//!   read by consumers that do not track buckets
//!
//! A current-bucket file means the artifact is fresh and must not be fetched
//! again this hour. Storing a new generation compares it against the newest
//! older one and then removes every older generation.

mod bucket;
mod clock;

pub use bucket::{BUCKET_SKEW_MINUTES, HourBucket};
pub use clock::{Clock, FixedClock, SystemClock};

use crate::detect::has_changed;
use crate::error::CacheError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix of the stable alias file names.
pub const ALIAS_PREFIX: &str = "siterm-link-";

/// Result of [`TimeBucketCache::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Current-bucket path for the artifact.
    pub path: PathBuf,
    /// The file already exists; skip the fetch.
    pub is_fresh: bool,
}

/// Result of [`TimeBucketCache::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    /// Newly written current-bucket file.
    pub path: PathBuf,
    /// Generation the new file was compared against, or `path` itself when
    /// no earlier generation existed.
    pub previous_path: PathBuf,
    /// Content differs from the previous generation.
    pub changed: bool,
}

/// Filesystem cache keyed by `(name, hour bucket)`.
pub struct TimeBucketCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TimeBucketCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeBucketCache")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl TimeBucketCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_bucket(&self) -> HourBucket {
        HourBucket::at(self.clock.now())
    }

    pub fn bucket_path(&self, name: &str, bucket: HourBucket) -> PathBuf {
        self.dir.join(format!("{}-{}.yaml", bucket.label(), name))
    }

    pub fn alias_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{ALIAS_PREFIX}{name}.yaml"))
    }

    /// Current-bucket path for `name` and whether it already exists.
    pub fn resolve(&self, name: &str) -> Resolved {
        let path = self.bucket_path(name, self.current_bucket());
        let is_fresh = path.is_file();
        Resolved { path, is_fresh }
    }

    /// Write `content` as the current generation of `name`.
    ///
    /// The file is written atomically, copied to the alias, compared with the
    /// newest older generation and then every older generation is removed.
    /// Alias and pruning failures are logged; only the primary write fails
    /// the call.
    pub fn store(&self, name: &str, content: &str) -> Result<StoreReceipt, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let current = self.current_bucket();
        let path = self.bucket_path(name, current);
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, content).map_err(|e| CacheError::io(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| CacheError::io(&path, e))?;

        let alias = self.alias_path(name);
        if let Err(e) = fs::copy(&path, &alias) {
            log::warn!("Failed to refresh alias {:?}: {}", alias, e);
        }

        let mut older = Vec::new();
        for (bucket, generation) in self.generations(name)? {
            if bucket < current {
                older.push((bucket, generation));
            } else if bucket > current {
                // Written before the clock went backwards; left for that hour.
                log::warn!(
                    "Keeping future cache file {:?} from bucket {}",
                    generation,
                    bucket
                );
            }
        }

        let previous_path = older
            .iter()
            .max_by_key(|(bucket, _)| *bucket)
            .map(|(_, p)| p.clone())
            .unwrap_or_else(|| path.clone());
        let changed = has_changed(&path, &previous_path);

        for (bucket, stale) in &older {
            log::info!("Removing cache file {:?} from bucket {}", stale, bucket);
            if let Err(e) = fs::remove_file(stale) {
                log::warn!("Failed to remove stale cache file {:?}: {}", stale, e);
            }
        }

        Ok(StoreReceipt {
            path,
            previous_path,
            changed,
        })
    }

    /// Parse a cached YAML file.
    pub fn read(&self, path: &Path) -> Result<serde_yaml_ng::Value, CacheError> {
        let text = fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
        serde_yaml_ng::from_str(&text).map_err(|source| CacheError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Last-known-good content of `name`, if an alias exists.
    pub fn read_alias(&self, name: &str) -> Result<Option<serde_yaml_ng::Value>, CacheError> {
        let alias = self.alias_path(name);
        if !alias.is_file() {
            return Ok(None);
        }
        self.read(&alias).map(Some)
    }

    /// Every bucketed file on disk for `name`, oldest first.
    pub fn generations(&self, name: &str) -> Result<Vec<(HourBucket, PathBuf)>, CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(bucket) = bucket_of(file_name, name) {
                found.push((bucket, entry.path()));
            }
        }
        found.sort();
        Ok(found)
    }

    /// Remove every bucketed file and alias for the given names.
    ///
    /// Returns the number of files removed.
    pub fn cleanup(&self, names: &[&str]) -> Result<usize, CacheError> {
        let mut removed = 0;
        for name in names {
            let mut targets: Vec<PathBuf> = self
                .generations(name)?
                .into_iter()
                .map(|(_, p)| p)
                .collect();
            targets.push(self.alias_path(name));

            for target in targets {
                match fs::remove_file(&target) {
                    Ok(()) => {
                        log::info!("Removed cache file {:?}", target);
                        removed += 1;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(CacheError::io(&target, e)),
                }
            }
        }
        Ok(removed)
    }
}

/// Bucket encoded in `file_name` if it is a generation of exactly `name`.
fn bucket_of(file_name: &str, name: &str) -> Option<HourBucket> {
    let stem = file_name.strip_suffix(".yaml")?;
    let (label, rest) = stem.split_at_checked(13)?;
    if rest.strip_prefix('-')? != name {
        return None;
    }
    HourBucket::parse(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cache_at(
        dir: &Path,
        hour: u32,
        minute: u32,
    ) -> (TimeBucketCache, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 18, hour, minute, 0).unwrap(),
        ));
        (TimeBucketCache::with_clock(dir, clock.clone()), clock)
    }

    #[test]
    fn test_bucket_of_distinguishes_similar_names() {
        assert!(bucket_of("2026-10-18-13-FE-auth.yaml", "FE-auth").is_some());
        assert!(bucket_of("2026-10-18-13-FE-auth-re.yaml", "FE-auth").is_none());
        assert!(bucket_of("2026-10-18-13-FE-auth-re.yaml", "FE-auth-re").is_some());
        assert!(bucket_of("siterm-link-FE-auth.yaml", "FE-auth").is_none());
        assert!(bucket_of("2026-10-18-13-FE-auth.yaml.tmp", "FE-auth").is_none());
    }

    #[test]
    fn test_paths() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(temp.path(), 13, 5);
        assert_eq!(
            cache.resolve("mapping").path,
            temp.path().join("2026-10-18-13-mapping.yaml")
        );
        assert_eq!(
            cache.alias_path("mapping"),
            temp.path().join("siterm-link-mapping.yaml")
        );
    }

    #[test]
    fn test_resolve_fresh_after_store_same_hour() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, clock) = cache_at(temp.path(), 13, 5);

        let first = cache.resolve("X");
        assert!(!first.is_fresh);
        cache.store("X", "a: 1\n").unwrap();

        clock.advance(chrono::Duration::minutes(30));
        let second = cache.resolve("X");
        assert_eq!(second.path, first.path);
        assert!(second.is_fresh);
    }

    #[test]
    fn test_first_store_is_not_a_change() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(temp.path(), 13, 5);
        let receipt = cache.store("X", "a: 1\n").unwrap();
        assert_eq!(receipt.previous_path, receipt.path);
        assert!(!receipt.changed);
        assert_eq!(
            std::fs::read_to_string(cache.alias_path("X")).unwrap(),
            "a: 1\n"
        );
    }

    #[test]
    fn test_store_keeps_single_generation() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, clock) = cache_at(temp.path(), 13, 5);
        let first = cache.store("X", "a: 1\n").unwrap();

        clock.advance(chrono::Duration::hours(1));
        let second = cache.store("X", "a: 1\n").unwrap();

        assert_eq!(second.previous_path, first.path);
        assert!(!second.changed);
        assert!(!first.path.exists());
        let gens = cache.generations("X").unwrap();
        assert_eq!(gens.len(), 1);
        assert_eq!(gens[0].1, second.path);
        assert!(cache.alias_path("X").is_file());
    }

    #[test]
    fn test_store_detects_changed_content() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, clock) = cache_at(temp.path(), 13, 5);
        cache.store("X", "a: 1\n").unwrap();
        clock.advance(chrono::Duration::hours(1));
        assert!(cache.store("X", "a: 2\n").unwrap().changed);
    }

    #[test]
    fn test_store_compares_with_newest_older_generation_and_prunes_all() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, clock) = cache_at(temp.path(), 9, 0);
        cache.store("X", "a: 1\n").unwrap();
        // A generation left behind by an interrupted run.
        std::fs::write(temp.path().join("2026-10-18-11-X.yaml"), "a: 2\n").unwrap();

        clock.set(Utc.with_ymd_and_hms(2026, 10, 18, 14, 0, 0).unwrap());
        let receipt = cache.store("X", "a: 2\n").unwrap();

        assert_eq!(
            receipt.previous_path,
            temp.path().join("2026-10-18-11-X.yaml")
        );
        assert!(!receipt.changed);
        assert_eq!(cache.generations("X").unwrap().len(), 1);
    }

    #[test]
    fn test_store_ignores_generations_newer_than_current_bucket() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(temp.path(), 13, 5);
        cache.store("X", "a: 1\n").unwrap();
        let future = temp.path().join("2026-10-18-15-X.yaml");
        std::fs::write(&future, "a: 9\n").unwrap();

        let receipt = cache.store("X", "a: 1\n").unwrap();

        assert_eq!(receipt.previous_path, receipt.path);
        assert!(!receipt.changed);
        assert!(future.is_file());
        assert_eq!(cache.generations("X").unwrap().len(), 2);
    }

    #[test]
    fn test_store_does_not_touch_other_names() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, clock) = cache_at(temp.path(), 13, 5);
        cache.store("FE-auth-re", "x: 1\n").unwrap();
        clock.advance(chrono::Duration::hours(1));
        cache.store("FE-auth", "y: 1\n").unwrap();
        assert_eq!(cache.generations("FE-auth-re").unwrap().len(), 1);
    }

    #[test]
    fn test_read_alias_missing() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(temp.path(), 13, 5);
        assert!(cache.read_alias("X").unwrap().is_none());
    }

    #[test]
    fn test_read_invalid_yaml() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(temp.path(), 13, 5);
        let path = temp.path().join("bad.yaml");
        std::fs::write(&path, "a: [").unwrap();
        assert!(matches!(cache.read(&path), Err(CacheError::Yaml { .. })));
    }

    #[test]
    fn test_cleanup_removes_buckets_and_aliases() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(temp.path(), 13, 5);
        cache.store("mapping", "a: 1\n").unwrap();
        cache.store("FE-main", "b: 1\n").unwrap();
        std::fs::write(temp.path().join("unrelated.txt"), "keep").unwrap();

        let removed = cache.cleanup(&["mapping", "FE-main", "FE-auth"]).unwrap();
        assert_eq!(removed, 4);
        assert!(!cache.resolve("mapping").is_fresh);
        assert!(!cache.alias_path("FE-main").exists());
        assert!(temp.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_generations_of_missing_dir() {
        let temp = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(&temp.path().join("absent"), 13, 5);
        assert!(cache.generations("X").unwrap().is_empty());
        assert_eq!(cache.cleanup(&["X"]).unwrap(), 0);
    }
}
