//! Low-level key-value storage backend trait and supporting types.
//!
//! The [`StorageBackend`] trait defines the contract every storage engine
//! implements: [`get`](StorageBackend::get), [`put`](StorageBackend::put),
//! [`put_if_version`](StorageBackend::put_if_version),
//! [`delete`](StorageBackend::delete),
//! [`list_by_prefix`](StorageBackend::list_by_prefix) and
//! [`next_sequence`](StorageBackend::next_sequence).
//!
//! Domain logic (identity assignment policy, serialization, owner filtering)
//! does **not** belong here. Backends are dumb KV stores; the record store
//! and the cache store sit on top.
//!
//! # Key Structure
//!
//! Records live under `record:{kind}:{id}`, identity sequences under
//! `seq:{kind}`, cache entries under `{namespace}:{scope}`. Kinds and
//! namespaces never contain a colon.
//!
//! # Versioning
//!
//! Each stored value carries a monotonic `u64` version starting at 1,
//! incremented on every successful write. [`put_if_version`](StorageBackend::put_if_version)
//! provides compare-and-swap for optimistic concurrency.

use std::fmt;

use async_trait::async_trait;

use crate::constants::{RECORD_KEY_PREFIX, SEQUENCE_KEY_PREFIX};
use crate::domain::{RecordId, RecordKind};

/// A stored value paired with its monotonic version number.
#[derive(Debug, Clone)]
pub struct VersionedRecord {
    /// The serialized bytes (JSON).
    pub data: Vec<u8>,

    /// Monotonic version number. Starts at 1, increments on each
    /// successful write.
    pub version: u64,
}

/// Errors that can occur during raw storage operations.
///
/// The record store maps these to
/// [`PersistenceError`](crate::error::PersistenceError) before they reach
/// repository callers.
///
/// # Examples
///
/// ```
/// use pawtrack::store::backend::StorageError;
///
/// let err = StorageError::VersionConflict {
///     key: "record:reminder:5".to_string(),
///     expected: 2,
///     actual: 3,
/// };
/// assert!(err.to_string().contains("expected 2"));
/// ```
#[derive(Debug)]
pub enum StorageError {
    /// The requested key was not found.
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// A [`put_if_version`](StorageBackend::put_if_version) call failed
    /// because the stored version does not match the expected version.
    VersionConflict {
        /// The key where the conflict occurred.
        key: String,
        /// The version the caller expected.
        expected: u64,
        /// The actual version found in storage.
        actual: u64,
    },

    /// The backend has reached a capacity limit.
    CapacityExceeded {
        /// Human-readable description of the capacity issue.
        message: String,
    },

    /// An I/O or backend-specific error occurred.
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "key not found: {key}"),
            Self::VersionConflict {
                key,
                expected,
                actual,
            } => write!(
                f,
                "version conflict on key {key}: expected {expected}, found {actual}"
            ),
            Self::CapacityExceeded { message } => {
                write!(f, "capacity exceeded: {message}")
            },
            Self::Backend { message, .. } => write!(f, "backend error: {message}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

/// Key-value storage backend shared by the record store and the cache store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the same backend instance is
/// shared behind an `Arc` by every repository.
///
/// # Sequences
///
/// [`next_sequence`](StorageBackend::next_sequence) hands out identities.
/// Two calls for the same name must never return the same value, even when
/// made concurrently.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Retrieves a value by key.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no value exists for the key.
    /// - [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn get(&self, key: &str) -> Result<VersionedRecord, StorageError>;

    /// Stores a value unconditionally (create or overwrite).
    ///
    /// Returns the new version: 1 for new keys, previous + 1 otherwise.
    async fn put(&self, key: &str, data: &[u8]) -> Result<u64, StorageError>;

    /// Stores a value only if the current version matches `expected_version`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no value exists for the key.
    /// - [`StorageError::VersionConflict`] on version mismatch.
    async fn put_if_version(
        &self,
        key: &str,
        data: &[u8],
        expected_version: u64,
    ) -> Result<u64, StorageError>;

    /// Deletes a value. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Lists all values whose key starts with `prefix`.
    async fn list_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, VersionedRecord)>, StorageError>;

    /// Atomically increments and returns the named sequence, starting at 1.
    async fn next_sequence(&self, name: &str) -> Result<u64, StorageError>;
}

/// Storage key of a persisted record: `record:{kind}:{id}`.
///
/// # Examples
///
/// ```
/// use pawtrack::domain::{RecordId, RecordKind};
/// use pawtrack::store::backend::record_key;
///
/// let id = RecordId::new(5).unwrap();
/// assert_eq!(record_key(RecordKind::Reminder, id), "record:reminder:5");
/// ```
pub fn record_key(kind: RecordKind, id: RecordId) -> String {
    format!("{RECORD_KEY_PREFIX}:{kind}:{id}")
}

/// Prefix covering every record of a kind: `record:{kind}:`.
pub fn record_prefix(kind: RecordKind) -> String {
    format!("{RECORD_KEY_PREFIX}:{kind}:")
}

/// Name of the identity sequence for a kind: `seq:{kind}`.
pub fn sequence_name(kind: RecordKind) -> String {
    format!("{SEQUENCE_KEY_PREFIX}:{kind}")
}

/// Parses the identity out of a record key.
///
/// # Examples
///
/// ```
/// use pawtrack::store::backend::parse_record_key;
///
/// let (kind, id) = parse_record_key("record:health:12").unwrap();
/// assert_eq!(kind.as_str(), "health");
/// assert_eq!(id.get(), 12);
/// assert!(parse_record_key("cache:health/pet/P1").is_none());
/// ```
pub fn parse_record_key(key: &str) -> Option<(RecordKind, RecordId)> {
    let rest = key.strip_prefix(RECORD_KEY_PREFIX)?.strip_prefix(':')?;
    let (kind, id) = rest.split_once(':')?;
    Some((RecordKind::from_name(kind)?, id.parse().ok()?))
}
