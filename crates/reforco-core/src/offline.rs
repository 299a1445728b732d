//! Read-through loading with an offline fallback.
//!
//! A view that wants a resource calls `read_through` with the resource's cache
//! key, a fetch closure and a maximum age. A successful fetch is cached and
//! returned as `Fresh`. A failed fetch falls back to the cached copy
//! (`Stale`, the view should show an offline banner with the error) or, when
//! nothing valid is cached, to `Failed` with no data.
//!
//! The fetch runs exactly once per call; retries belong to the client's
//! `RetryPolicy`.

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::api::FetchError;
use crate::cache::CacheManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// The remote call succeeded
    Fresh,
    /// The remote call failed; data comes from the cache
    Stale {
        error: FetchError,
        /// When the served entry was stored (ms since epoch)
        cached_at: i64,
    },
    /// The remote call failed and nothing usable was cached
    Failed { error: FetchError },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub data: Option<T>,
    pub state: LoadState,
}

impl<T> Loaded<T> {
    /// Serving cached data because the backing store could not be reached.
    pub fn is_offline(&self) -> bool {
        matches!(self.state, LoadState::Stale { .. })
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.state {
            LoadState::Fresh => None,
            LoadState::Stale { error, .. } | LoadState::Failed { error } => Some(error),
        }
    }

    pub fn into_data_or_default(self) -> T
    where
        T: Default,
    {
        self.data.unwrap_or_default()
    }
}

/// Cached value for a quick first paint before the remote call returns.
pub fn preview<T: DeserializeOwned>(cache: &CacheManager, key: &str, max_age_minutes: u64) -> Option<T> {
    cache.load(key, max_age_minutes)
}

/// Fetch `key` from the remote source, caching on success and falling back
/// to a cached copy no older than `max_age_minutes` on failure.
pub async fn read_through<T, F, Fut>(
    cache: &CacheManager,
    key: &str,
    max_age_minutes: u64,
    fetch: F,
) -> Loaded<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    match fetch().await {
        Ok(fresh) => {
            if !cache.save(key, &fresh) {
                debug!(key, "Fresh data not cached");
            }
            Loaded {
                data: Some(fresh),
                state: LoadState::Fresh,
            }
        }
        Err(error) => match cache.load_cached::<T>(key, max_age_minutes) {
            Some(entry) => {
                info!(key, error = %error, "Remote fetch failed, serving cached data");
                Loaded {
                    data: Some(entry.data),
                    state: LoadState::Stale {
                        error,
                        cached_at: entry.timestamp,
                    },
                }
            }
            None => {
                warn!(key, error = %error, "Remote fetch failed and nothing is cached");
                Loaded {
                    data: None,
                    state: LoadState::Failed { error },
                }
            }
        },
    }
}
