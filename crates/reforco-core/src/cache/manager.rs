use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{FileStore, KeyValueStore, MemoryStore};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Key written and removed by `is_available` to probe the backend.
const PROBE_KEY: &str = "__reforco_probe__";

// ============================================================================
// Clock
// ============================================================================

/// Source of "now" for entry timestamps and expiry checks.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance_millis(minutes * MILLIS_PER_MINUTE);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Cached entries
// ============================================================================

/// On-disk shape of a cache entry: the payload and when it was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl<T> CachedData<T> {
    pub fn age_minutes(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.timestamp) / MILLIS_PER_MINUTE
    }

    /// Valid while `now - timestamp <= max_age`. Entries from the future
    /// (clock skew) count as fresh.
    pub fn is_expired(&self, now_millis: i64, max_age_minutes: u64) -> bool {
        let max_age_millis = i64::try_from(max_age_minutes)
            .unwrap_or(i64::MAX)
            .saturating_mul(MILLIS_PER_MINUTE);
        now_millis.saturating_sub(self.timestamp) > max_age_millis
    }

    pub fn age_display(&self, now_millis: i64) -> String {
        format_age(now_millis.saturating_sub(self.timestamp))
    }
}

/// Human-friendly age such as "just now", "5m ago", "2h ago" or "3d ago".
/// Negative ages (clock skew) read as "just now".
pub fn format_age(age_millis: i64) -> String {
    let minutes = age_millis / MILLIS_PER_MINUTE;
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        // Round up: 1h 30m+ becomes 2h
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

// ============================================================================
// Cache manager
// ============================================================================

/// Typed cache over a string key/value store.
///
/// No operation returns an error: storage failures are logged and reported as
/// `false` (writes) or a miss (reads), so callers can always carry on without
/// a cache. Clone is cheap; clones share the same backend.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self::with_clock(store, SystemClock)
    }

    pub fn with_clock(store: impl KeyValueStore + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(clock),
        }
    }

    /// Build from already shared parts (e.g. a clock the caller keeps a handle to).
    pub fn from_parts(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Disk-backed cache in `cache_dir`. Falls back to an in-memory cache when
    /// the directory cannot be created, so the app still runs (without
    /// persistence).
    pub fn open(cache_dir: PathBuf) -> Self {
        match FileStore::new(&cache_dir) {
            Ok(store) => Self::new(store),
            Err(e) => {
                warn!(?cache_dir, error = %e, "Cache directory unusable, using in-memory cache");
                Self::new(MemoryStore::new())
            }
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Store `data` under `key`, replacing any previous entry.
    /// Returns `false` if the entry could not be written.
    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> bool {
        let entry = CachedData {
            data,
            timestamp: self.clock.now_millis(),
        };

        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return false;
            }
        };

        match self.store.set_item(key, &serialized) {
            Ok(()) => {
                debug!(key, bytes = serialized.len(), "Cache entry stored");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to write cache entry");
                false
            }
        }
    }

    /// Load the entry for `key` with its timestamp, if present and no older
    /// than `max_age_minutes`. Expired and malformed entries are removed.
    pub fn load_cached<T: DeserializeOwned>(
        &self,
        key: &str,
        max_age_minutes: u64,
    ) -> Option<CachedData<T>> {
        let serialized = match self.store.get_item(key) {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!(key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let entry: CachedData<T> = match serde_json::from_str(&serialized) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Discarding malformed cache entry");
                self.remove(key);
                return None;
            }
        };

        let now = self.clock.now_millis();
        if entry.is_expired(now, max_age_minutes) {
            debug!(key, age_minutes = entry.age_minutes(now), max_age_minutes, "Cache entry expired");
            self.remove(key);
            return None;
        }

        debug!(key, age_minutes = entry.age_minutes(now), "Cache hit");
        Some(entry)
    }

    /// Load the payload for `key`; see `load_cached`.
    pub fn load<T: DeserializeOwned>(&self, key: &str, max_age_minutes: u64) -> Option<T> {
        self.load_cached(key, max_age_minutes).map(|entry| entry.data)
    }

    /// Remove the entry for `key`. Removing a missing key succeeds.
    pub fn remove(&self, key: &str) -> bool {
        match self.store.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to remove cache entry");
                false
            }
        }
    }

    /// Remove every entry in the backing store.
    pub fn clear(&self) -> bool {
        match self.store.clear() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to clear cache");
                false
            }
        }
    }

    /// Whether the backend currently accepts writes.
    pub fn is_available(&self) -> bool {
        let written = self.store.set_item(PROBE_KEY, PROBE_KEY).is_ok();
        let removed = self.store.remove_item(PROBE_KEY).is_ok();
        written && removed
    }
}

// ============================================================================
// Tests
// ============================================================================
