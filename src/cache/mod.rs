//! Last-known-good caching for remote reads.

pub mod fallback;
pub mod locks;
pub mod store;

pub use fallback::{CacheFallbackAccessor, Fetched, Source};
pub use locks::{KeyedGuard, KeyedLocks};
pub use store::{CacheEntry, CacheError, CacheScope, CacheStore, Cacheable};
