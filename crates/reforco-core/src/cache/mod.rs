//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for storing and retrieving
//! backing-store results locally. Entries are persisted as
//! `{"data": ..., "timestamp": <ms>}` JSON and expire once they are older
//! than the maximum age the caller asks for.
//!
//! - `key`: deterministic cache keys from a prefix and query parameters
//! - `store`: string-valued key/value backends (files on disk, memory)
//! - `manager`: typed save/load with expiry on top of a backend

pub mod key;
pub mod manager;
pub mod store;

pub use key::generate_cache_key;
pub use manager::{format_age, CacheManager, CachedData, Clock, ManualClock, SystemClock};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
