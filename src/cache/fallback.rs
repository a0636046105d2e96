//! Remote-first reads with last-known-good fallback.
//!
//! [`CacheFallbackAccessor::fetch`] implements the read strategy shared by
//! every repository:
//!
//! 1. Call the remote.
//! 2. On success, overwrite the cache entry for the scope and return the
//!    value.
//! 3. On an authoritative failure (`NotFound`), evict the scope and return
//!    the error; deleted records are never served from cache.
//! 4. On any other failure, return the cached value if there is a non-empty
//!    one, otherwise the **original** remote error. Cache read failures count
//!    as "no cached value". The fallback path never writes the cache.
//!
//! A value served from cache looks exactly like a live one through
//! [`fetch`](CacheFallbackAccessor::fetch). Callers that need to know use
//! [`fetch_with_source`](CacheFallbackAccessor::fetch_with_source).

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::store::{CacheScope, CacheStore, Cacheable};
use crate::remote::RemoteError;

/// Where a fetched value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A live remote answer.
    Remote,
    /// The last value a successful remote fetch stored for this scope.
    Cache {
        /// When that value was stored.
        stored_at: DateTime<Utc>,
    },
}

/// A fetched value together with its [`Source`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// The value.
    pub value: T,
    /// Its origin.
    pub source: Source,
}

impl<T> Fetched<T> {
    /// Returns `true` if the value came from cache.
    pub fn is_stale(&self) -> bool {
        matches!(self.source, Source::Cache { .. })
    }
}

/// Remote-first, cache-on-success, cache-as-fallback read strategy.
#[derive(Debug, Clone)]
pub struct CacheFallbackAccessor {
    cache: Arc<CacheStore>,
}

impl CacheFallbackAccessor {
    /// Creates an accessor over `cache`.
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self { cache }
    }

    /// The cache store this accessor writes to.
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Fetches through `remote`, falling back to the cache for `scope`.
    pub async fn fetch<T, F, Fut>(&self, scope: &CacheScope, remote: F) -> Result<T, RemoteError>
    where
        T: Cacheable,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, RemoteError>> + Send,
    {
        self.fetch_with_source(scope, remote)
            .await
            .map(|fetched| fetched.value)
    }

    /// Like [`fetch`](Self::fetch), but reports whether the value is live.
    pub async fn fetch_with_source<T, F, Fut>(
        &self,
        scope: &CacheScope,
        remote: F,
    ) -> Result<Fetched<T>, RemoteError>
    where
        T: Cacheable,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, RemoteError>> + Send,
    {
        let error = match remote().await {
            Ok(value) => {
                if let Err(err) = self.cache.write(scope, &value).await {
                    warn!(%scope, error = %err, "failed to refresh cache after remote fetch");
                }
                return Ok(Fetched {
                    value,
                    source: Source::Remote,
                });
            },
            Err(error) => error,
        };

        if error.is_authoritative() {
            if let Err(err) = self.cache.evict(scope).await {
                warn!(%scope, error = %err, "failed to evict cache entry");
            }
            return Err(error);
        }

        match self.cache.read::<T>(scope).await {
            Ok(Some(entry)) if !entry.value.is_empty_result() => {
                warn!(
                    %scope,
                    remote_error = %error,
                    category = error.category(),
                    stored_at = %entry.stored_at,
                    "remote fetch failed; serving cached value"
                );
                Ok(Fetched {
                    value: entry.value,
                    source: Source::Cache {
                        stored_at: entry.stored_at,
                    },
                })
            },
            Ok(_) => {
                debug!(%scope, remote_error = %error, "remote fetch failed and cache is empty");
                Err(error)
            },
            Err(cache_error) => {
                warn!(
                    %scope,
                    remote_error = %error,
                    cache_error = %cache_error,
                    "remote fetch failed and cache read failed"
                );
                Err(error)
            },
        }
    }
}
