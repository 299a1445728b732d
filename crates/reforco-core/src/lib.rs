//! Core library for Reforço: an offline-tolerant client for a tutoring
//! business whose lessons and students live in a hosted backing store.
//!
//! - `api`: backing-store REST client with typed errors and retry policy
//! - `cache`: persistent key/value cache with timestamp-based expiry
//! - `calendar`: month arithmetic and the calendar cache key
//! - `config`: user configuration and directory resolution
//! - `models`: lesson, student and assistant row types
//! - `offline`: read-through orchestration (fresh / stale / failed)

pub mod api;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod models;
pub mod offline;

pub use api::{BackendClient, FetchError, FetchErrorKind, RetryPolicy};
pub use cache::{generate_cache_key, CacheManager};
pub use calendar::CalendarMonth;
pub use config::Config;
pub use offline::{preview, read_through, LoadState, Loaded};
