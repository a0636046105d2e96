//! In-memory storage backend.
//!
//! [`InMemoryBackend`] provides a thread-safe [`StorageBackend`] using
//! `DashMap<String, (Vec<u8>, u64)>` for values and a second map for
//! identity sequences. It is a dumb KV store with no domain logic.
//!
//! # Concurrency
//!
//! `DashMap` gives shard-level locking. Sequence increments and
//! compare-and-swap writes happen while holding the entry's shard lock, so
//! they are atomic with respect to each other.
//!
//! # Examples
//!
//! ```
//! use pawtrack::store::memory::InMemoryBackend;
//!
//! let backend = InMemoryBackend::new().with_max_entries(10_000);
//! assert!(backend.is_empty());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::store::backend::{StorageBackend, StorageError, VersionedRecord};

/// Thread-safe in-memory storage backend using [`DashMap`].
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: DashMap<String, (Vec<u8>, u64)>,
    sequences: DashMap<String, u64>,
    max_entries: Option<usize>,
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    /// Creates an empty in-memory backend without a size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of stored values. Writes creating a new key beyond
    /// the cap fail with [`StorageError::CapacityExceeded`].
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Simulates an unavailable storage engine: every operation fails with
    /// [`StorageError::Backend`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Backend {
                message: "in-memory backend marked unavailable".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    fn check_capacity(&self, key: &str) -> Result<(), StorageError> {
        match self.max_entries {
            Some(max) if self.data.len() >= max && !self.data.contains_key(key) => {
                Err(StorageError::CapacityExceeded {
                    message: format!("max {max} entries"),
                })
            },
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<VersionedRecord, StorageError> {
        self.check_available()?;
        let entry = self.data.get(key).ok_or_else(|| StorageError::NotFound {
            key: key.to_string(),
        })?;
        let (data, version) = entry.value();
        Ok(VersionedRecord {
            data: data.clone(),
            version: *version,
        })
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<u64, StorageError> {
        self.check_available()?;
        self.check_capacity(key)?;
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| (Vec::new(), 0));
        let new_version = entry.value().1 + 1;
        *entry.value_mut() = (data.to_vec(), new_version);
        Ok(new_version)
    }

    async fn put_if_version(
        &self,
        key: &str,
        data: &[u8],
        expected_version: u64,
    ) -> Result<u64, StorageError> {
        self.check_available()?;
        let mut entry = self
            .data
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })?;
        let current_version = entry.value().1;
        if current_version != expected_version {
            return Err(StorageError::VersionConflict {
                key: key.to_string(),
                expected: expected_version,
                actual: current_version,
            });
        }
        let new_version = current_version + 1;
        *entry.value_mut() = (data.to_vec(), new_version);
        Ok(new_version)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.check_available()?;
        Ok(self.data.remove(key).is_some())
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, VersionedRecord)>, StorageError> {
        self.check_available()?;
        let results = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| {
                let (data, version) = entry.value();
                (
                    entry.key().clone(),
                    VersionedRecord {
                        data: data.clone(),
                        version: *version,
                    },
                )
            })
            .collect();
        Ok(results)
    }

    async fn next_sequence(&self, name: &str) -> Result<u64, StorageError> {
        self.check_available()?;
        let mut entry = self.sequences.entry(name.to_string()).or_insert(0);
        *entry.value_mut() += 1;
        Ok(*entry.value())
    }
}
