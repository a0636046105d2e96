//! Explicit cache store with a defined lifecycle.
//!
//! [`CacheStore`] holds the last successfully fetched value per
//! [`CacheScope`]. Entries are JSON documents kept in a [`StorageBackend`]
//! under `{namespace}:{scope}`, so the cache lives wherever the record store
//! lives (in memory, or in a durable engine). The store must be
//! [`init`](CacheStore::init)ialized before use and can be
//! [`clear`](CacheStore::clear)ed as a whole.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::locks::KeyedLocks;
use crate::clock::Clock;
use crate::config::{check_namespace, CacheConfig};
use crate::domain::{Payload, PetId, RecordId, RecordKind, TrackableRecord};
use crate::store::backend::{StorageBackend, StorageError};

/// Identifies one cached query result.
///
/// # Examples
///
/// ```
/// use pawtrack::cache::CacheScope;
/// use pawtrack::domain::{PetId, RecordId, RecordKind};
///
/// let scope = CacheScope::for_pet(RecordKind::Health, &PetId::new("P2"));
/// assert_eq!(scope.as_str(), "health/pet/P2");
///
/// let scope = CacheScope::for_record(RecordKind::Reminder, RecordId::new(5).unwrap());
/// assert_eq!(scope.as_str(), "reminder/id/5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheScope(String);

impl CacheScope {
    /// Scope of "all records of `kind` for `pet_id`".
    pub fn for_pet(kind: RecordKind, pet_id: &PetId) -> Self {
        Self(format!("{kind}/pet/{pet_id}"))
    }

    /// Scope of "the record of `kind` with identity `id`".
    pub fn for_record(kind: RecordKind, id: RecordId) -> Self {
        Self(format!("{kind}/id/{id}"))
    }

    /// Free-form scope for queries outside the two standard shapes.
    pub fn custom(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    /// The scope as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached value and when it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The cached value.
    pub value: T,
    /// When the value was written.
    pub stored_at: DateTime<Utc>,
}

/// A value that can be cached.
///
/// [`is_empty_result`](Self::is_empty_result) decides whether a cached value
/// counts as an answer during fallback: an empty list does not.
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync {
    /// Returns `true` when this value carries no information.
    fn is_empty_result(&self) -> bool {
        false
    }
}

impl<P: Payload> Cacheable for TrackableRecord<P> {}

impl<T: Cacheable> Cacheable for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

/// Cache failures. The read path logs and swallows these.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The store was used before [`CacheStore::init`].
    #[error("cache store used before init")]
    NotInitialized,

    /// The namespace would overlap record or sequence keys.
    #[error("invalid cache namespace {namespace:?}: {reason}")]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The backing storage failed.
    #[error("cache storage failure: {0}")]
    Storage(#[from] StorageError),

    /// A cache entry could not be encoded or decoded.
    #[error("cache entry {scope} could not be (de)serialized: {source}")]
    Serialization {
        /// The scope involved.
        scope: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Last-known-good values per query scope.
#[derive(Debug)]
pub struct CacheStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    namespace: String,
    enabled: bool,
    ready: AtomicBool,
    pub(crate) locks: KeyedLocks,
}

impl CacheStore {
    /// Creates an uninitialized cache store over `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        Self {
            backend,
            clock,
            namespace: config.namespace.clone(),
            enabled: config.enabled,
            ready: AtomicBool::new(false),
            locks: KeyedLocks::new(),
        }
    }

    /// Marks the store ready. Idempotent.
    ///
    /// Fails if the namespace could make [`clear`](Self::clear) reach
    /// persisted records.
    pub fn init(&self) -> Result<(), CacheError> {
        check_namespace(&self.namespace).map_err(|reason| CacheError::InvalidNamespace {
            namespace: self.namespace.clone(),
            reason,
        })?;
        if !self.ready.swap(true, Ordering::SeqCst) {
            info!(namespace = %self.namespace, enabled = self.enabled, "cache store initialized");
        }
        Ok(())
    }

    /// Returns `true` after [`init`](Self::init).
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Returns `false` when caching is switched off by configuration.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Removes every entry in this store's namespace. Returns how many were
    /// removed.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        self.ensure_ready()?;
        let prefix = format!("{}:", self.namespace);
        let keys: Vec<String> = self
            .backend
            .list_by_prefix(&prefix)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        let mut removed = 0;
        for key in keys {
            if self.backend.delete(&key).await? {
                removed += 1;
            }
        }
        info!(namespace = %self.namespace, removed, "cache cleared");
        Ok(removed)
    }

    /// Reads the entry for `scope`.
    pub async fn read<T: Cacheable>(&self, scope: &CacheScope) -> Result<Option<CacheEntry<T>>, CacheError> {
        self.ensure_ready()?;
        if !self.enabled {
            return Ok(None);
        }
        match self.backend.get(&self.key(scope)).await {
            Ok(stored) => serde_json::from_slice(&stored.data)
                .map(Some)
                .map_err(|source| CacheError::Serialization {
                    scope: scope.to_string(),
                    source,
                }),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Overwrites the entry for `scope` with `value`.
    pub async fn write<T: Cacheable>(&self, scope: &CacheScope, value: &T) -> Result<(), CacheError> {
        self.ensure_ready()?;
        if !self.enabled {
            return Ok(());
        }
        let _guard = self.locks.lock(scope.as_str()).await;
        self.write_unlocked(scope, value).await
    }

    /// Removes the entry for `scope`. Returns `true` if one existed.
    pub async fn evict(&self, scope: &CacheScope) -> Result<bool, CacheError> {
        self.ensure_ready()?;
        if !self.enabled {
            return Ok(false);
        }
        let _guard = self.locks.lock(scope.as_str()).await;
        let removed = self.backend.delete(&self.key(scope)).await?;
        if removed {
            debug!(%scope, "cache entry evicted");
        }
        Ok(removed)
    }

    /// Applies `change` to an existing entry under the scope's lock.
    ///
    /// Nothing happens when the scope has no entry; a missing entry means
    /// the next successful fetch will fill it. Returns `true` if an entry was
    /// rewritten.
    pub async fn modify<T, F>(&self, scope: &CacheScope, change: F) -> Result<bool, CacheError>
    where
        T: Cacheable,
        F: FnOnce(&mut T) + Send,
    {
        self.ensure_ready()?;
        if !self.enabled {
            return Ok(false);
        }
        let _guard = self.locks.lock(scope.as_str()).await;
        let Some(mut entry) = self.read::<T>(scope).await? else {
            return Ok(false);
        };
        change(&mut entry.value);
        self.write_unlocked(scope, &entry.value).await?;
        Ok(true)
    }

    async fn write_unlocked<T: Cacheable>(&self, scope: &CacheScope, value: &T) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        let bytes = serde_json::to_vec(&entry).map_err(|source| CacheError::Serialization {
            scope: scope.to_string(),
            source,
        })?;
        self.backend.put(&self.key(scope), &bytes).await?;
        debug!(%scope, "cache entry written");
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), CacheError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(CacheError::NotInitialized)
        }
    }

    fn key(&self, scope: &CacheScope) -> String {
        format!("{}:{}", self.namespace, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::memory::InMemoryBackend;
    use chrono::{Duration, TimeZone};

    fn cache_with(config: CacheConfig) -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
        ));
        let cache = CacheStore::new(Arc::new(InMemoryBackend::new()), clock.clone(), &config);
        (cache, clock)
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note(String);

    impl Cacheable for Note {}

    #[tokio::test]
    async fn use_before_init_is_an_error() {
        let (cache, _) = cache_with(CacheConfig::default());
        let scope = CacheScope::custom("x");
        assert!(matches!(
            cache.read::<Note>(&scope).await,
            Err(CacheError::NotInitialized)
        ));
        cache.init().unwrap();
        assert!(cache.read::<Note>(&scope).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn init_rejects_namespaces_that_reach_records() {
        for namespace in ["record", "seq", "a:b"] {
            let (cache, _) = cache_with(CacheConfig {
                namespace: namespace.to_string(),
                ..CacheConfig::default()
            });
            assert!(matches!(cache.init(), Err(CacheError::InvalidNamespace { .. })));
            assert!(!cache.is_ready());
            assert!(matches!(cache.clear().await, Err(CacheError::NotInitialized)));
        }
    }

    #[tokio::test]
    async fn write_overwrites_and_stamps_time() {
        let (cache, clock) = cache_with(CacheConfig::default());
        cache.init().unwrap();
        let scope = CacheScope::custom("notes");

        cache.write(&scope, &vec![Note("a".into())]).await.unwrap();
        clock.advance(Duration::minutes(5));
        cache.write(&scope, &vec![Note("b".into())]).await.unwrap();

        let entry = cache.read::<Vec<Note>>(&scope).await.unwrap().unwrap();
        assert_eq!(entry.value, vec![Note("b".into())]);
        assert_eq!(entry.stored_at, clock.now());
    }

    #[tokio::test]
    async fn modify_only_touches_existing_entries() {
        let (cache, _) = cache_with(CacheConfig::default());
        cache.init().unwrap();
        let scope = CacheScope::custom("notes");

        let changed = cache
            .modify(&scope, |notes: &mut Vec<Note>| notes.push(Note("x".into())))
            .await
            .unwrap();
        assert!(!changed);
        assert!(cache.read::<Vec<Note>>(&scope).await.unwrap().is_none());

        cache.write(&scope, &Vec::<Note>::new()).await.unwrap();
        let changed = cache
            .modify(&scope, |notes: &mut Vec<Note>| notes.push(Note("x".into())))
            .await
            .unwrap();
        assert!(changed);
        let entry = cache.read::<Vec<Note>>(&scope).await.unwrap().unwrap();
        assert_eq!(entry.value.len(), 1);
    }

    #[tokio::test]
    async fn clear_removes_only_this_namespace() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.put("record:care:1", b"{}").await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let cache = CacheStore::new(backend.clone(), clock, &CacheConfig::default());
        cache.init().unwrap();
        cache.write(&CacheScope::custom("a"), &Note("1".into())).await.unwrap();
        cache.write(&CacheScope::custom("b"), &Note("2".into())).await.unwrap();

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let (cache, _) = cache_with(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        cache.init().unwrap();
        let scope = CacheScope::custom("notes");
        cache.write(&scope, &Note("a".into())).await.unwrap();
        assert!(cache.read::<Note>(&scope).await.unwrap().is_none());
    }
}
