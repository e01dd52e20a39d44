//! File-backed JSON cache with a time-to-live.
//!
//! Entries are plain pretty-printed JSON files under a cache root. An entry's
//! age comes from the file's modification time; anything older than the TTL,
//! or anything that fails to parse, is deleted and reported as a miss.
//!
//! The cache assumes a single writer. Two processes sharing a root race and
//! the last writer wins; writes go through a temporary file and a rename so a
//! reader never sees half-written JSON.

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::runtime::Runtime;

/// Default lifetime of cache entries.
pub const DEFAULT_TTL_MINUTES: u64 = 60;

pub struct FileCache<R: Runtime> {
    runtime: R,
    root: PathBuf,
    ttl_minutes: u64,
}

impl<R: Runtime> FileCache<R> {
    pub fn new(runtime: R, root: impl Into<PathBuf>, ttl_minutes: u64) -> Self {
        Self {
            runtime,
            root: root.into(),
            ttl_minutes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl_minutes(&self) -> u64 {
        self.ttl_minutes
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Location of the entry for `key`. Path separators in the key are flattened.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key.replace(['/', '\\'], "_"))
    }

    /// Age of the entry, or `None` if it does not exist.
    fn age(&self, path: &Path) -> Option<Duration> {
        if !self.runtime.exists(path) {
            return None;
        }
        let modified = self.runtime.modified(path).ok()?;
        // A timestamp in the future counts as brand new
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Reads a fresh entry. Expired or unreadable entries are removed.
    #[tracing::instrument(skip(self))]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        let age = self.age(&path)?;

        if !within_ttl(age, self.ttl_minutes) {
            debug!(
                "Cache entry {:?} expired ({}s old, ttl {}m)",
                path,
                age.as_secs(),
                self.ttl_minutes
            );
            self.discard(&path);
            return None;
        }

        let parsed = self
            .runtime
            .read_to_string(&path)
            .and_then(|content| Ok(serde_json::from_str::<T>(&content)?));

        match parsed {
            Ok(value) => {
                debug!("Cache hit for {:?}", path);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry {:?}: {}", path, e);
                self.discard(&path);
                None
            }
        }
    }

    /// Stores `value` as pretty-printed JSON. Failures are logged, never returned.
    #[tracing::instrument(skip(self, value))]
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let path = self.path(key);
        if let Err(e) = self.write_entry(&path, value) {
            warn!("Failed to write cache entry {:?}: {:#}", path, e);
        }
    }

    fn write_entry<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        self.runtime.create_dir_all(&self.root)?;
        let content = serde_json::to_string_pretty(value)?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        self.runtime.write(&tmp_path, content.as_bytes())?;
        self.runtime.rename(&tmp_path, path)?;
        debug!("Cached {:?}", path);
        Ok(())
    }

    /// Removes the entry for `key` if present.
    pub fn invalidate(&self, key: &str) {
        let path = self.path(key);
        if self.runtime.exists(&path) {
            self.discard(&path);
        }
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = self.runtime.remove_file(path) {
            debug!("Could not remove cache entry {:?}: {}", path, e);
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its result.
    ///
    /// Errors from `fetch` are returned unchanged and nothing is cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key) {
            return Ok(cached);
        }
        let value = fetch().await?;
        self.put(key, &value);
        Ok(value)
    }
}

/// `age == ttl` is still valid.
pub(crate) fn within_ttl(age: Duration, ttl_minutes: u64) -> bool {
    age <= Duration::from_secs(ttl_minutes.saturating_mul(60))
}
