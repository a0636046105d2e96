//! Per-key async mutual exclusion.
//!
//! Repositories serialize writes to one entity, the scheduler serializes
//! cancel+enqueue for one job key, and the cache store serializes
//! read-modify-write of one scope. All three use [`KeyedLocks`].

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// A map of lazily created async mutexes, one per key.
///
/// Cloning shares the underlying map. An entry lives only while some task
/// holds or waits for its lock; releasing the last [`KeyedGuard`] removes it.
///
/// # Examples
///
/// ```
/// # tokio_test_block_on(async {
/// use pawtrack::cache::KeyedLocks;
///
/// let locks = KeyedLocks::new();
/// let guard = locks.lock("reminder:5").await;
/// assert!(locks.try_lock("reminder:5").is_none());
/// assert!(locks.try_lock("reminder:6").is_some());
/// drop(guard);
/// assert!(locks.is_empty());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<LockMap>,
}

/// Exclusive access to one key of a [`KeyedLocks`].
///
/// Dropping the guard releases the lock and forgets the key when nobody
/// else is waiting on it.
#[derive(Debug)]
pub struct KeyedGuard {
    key: String,
    map: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Release first: the guard holds its own reference to the mutex.
        drop(self.guard.take());
        self.map
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyedLocks {
    /// Creates an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let guard = self.mutex_for(key).lock_owned().await;
        self.wrap(key, guard)
    }

    /// Takes exclusive access to `key` if nobody holds it.
    pub fn try_lock(&self, key: &str) -> Option<KeyedGuard> {
        let mutex = self.mutex_for(key);
        match mutex.try_lock_owned() {
            Ok(guard) => Some(self.wrap(key, guard)),
            Err(_) => None,
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` when no key is held or waited on.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn wrap(&self, key: &str, guard: OwnedMutexGuard<()>) -> KeyedGuard {
        KeyedGuard {
            key: key.to_string(),
            map: Arc::clone(&self.inner),
            guard: Some(guard),
        }
    }

    fn mutex_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.inner.entry(key.to_string()).or_default().value().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let guard = locks.lock("a").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = contender.lock("a").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn released_keys_are_forgotten() {
        let locks = KeyedLocks::new();
        let held = locks.lock("held").await;
        drop(locks.lock("idle").await);
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn waiter_keeps_the_entry_alive() {
        let locks = KeyedLocks::new();
        let guard = locks.lock("a").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = contender.lock("a").await;
            contender.len()
        });
        tokio::task::yield_now().await;
        drop(guard);

        assert_eq!(waiter.await.unwrap(), 1);
        assert!(locks.is_empty());
    }

    #[test]
    fn failed_try_lock_leaves_holder_in_charge() {
        let locks = KeyedLocks::new();
        let guard = locks.try_lock("a").unwrap();
        assert!(locks.try_lock("a").is_none());
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }
}
