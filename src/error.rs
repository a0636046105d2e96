//! Error types surfaced by the record store and the repository facades.
//!
//! Lower layers keep their own error enums ([`StorageError`],
//! [`RemoteError`], [`JobError`]). The record store maps storage failures
//! into [`PersistenceError`]; the repositories wrap everything in
//! [`TrackingError`], which is what every facade operation returns.

use crate::domain::{RecordId, RecordKind};
use crate::jobs::JobError;
use crate::remote::RemoteError;
use crate::store::backend::StorageError;

/// Failures of the durable record store. Never recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A compare-and-swap write lost against a concurrent writer.
    #[error("concurrent modification of {key}: expected version {expected}, found {actual}")]
    Conflict {
        /// Storage key of the record.
        key: String,
        /// Version the writer read.
        expected: u64,
        /// Version found at write time.
        actual: u64,
    },

    /// The record disappeared between read and write.
    #[error("record vanished during write: {key}")]
    Vanished {
        /// Storage key of the record.
        key: String,
    },

    /// The storage engine is full.
    #[error("storage full: {message}")]
    CapacityExceeded {
        /// Backend-provided description.
        message: String,
    },

    /// The storage engine failed.
    #[error("storage backend failure: {message}")]
    Backend {
        /// Backend-provided description.
        message: String,
    },

    /// A stored value could not be encoded or decoded.
    #[error("failed to (de)serialize {key}: {source}")]
    Serialization {
        /// Storage key involved.
        key: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl From<StorageError> for PersistenceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => Self::Vanished { key },
            StorageError::VersionConflict {
                key,
                expected,
                actual,
            } => Self::Conflict {
                key,
                expected,
                actual,
            },
            StorageError::CapacityExceeded { message } => Self::CapacityExceeded { message },
            StorageError::Backend { message, .. } => Self::Backend { message },
        }
    }
}

/// Errors returned by the repository facades.
///
/// # Examples
///
/// ```
/// use pawtrack::domain::{RecordId, RecordKind};
/// use pawtrack::error::TrackingError;
/// use pawtrack::remote::RemoteError;
///
/// let err = TrackingError::NotFound {
///     kind: RecordKind::Reminder,
///     id: RecordId::new(5).unwrap(),
/// };
/// assert_eq!(err.to_string(), "reminder 5 not found");
/// assert!(err.is_not_found());
///
/// let err = TrackingError::from(RemoteError::Timeout);
/// assert!(err.remote().is_some());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// No record with this identity exists.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record domain.
        kind: RecordKind,
        /// Requested identity.
        id: RecordId,
    },

    /// `create` was called with a record that already has an identity.
    #[error("{kind} {id} is already persisted; use update instead")]
    AlreadyPersisted {
        /// Record domain.
        kind: RecordKind,
        /// Existing identity.
        id: RecordId,
    },

    /// The remote API failed and no cached answer was available.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The durable record store failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The job executor rejected a schedule or cancel request.
    #[error(transparent)]
    Scheduling(#[from] JobError),
}

impl TrackingError {
    /// Returns `true` for [`TrackingError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the underlying remote error, if this failure came from the
    /// remote API.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

/// Result alias used by the repository facades.
pub type Result<T, E = TrackingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_persistence_errors() {
        let err: PersistenceError = StorageError::VersionConflict {
            key: "record:reminder:1".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(err, PersistenceError::Conflict { actual: 2, .. }));

        let err: PersistenceError = StorageError::Backend {
            message: "disk gone".to_string(),
            source: None,
        }
        .into();
        assert_eq!(err.to_string(), "storage backend failure: disk gone");
    }

    #[test]
    fn remote_errors_pass_through_verbatim() {
        let remote = RemoteError::Unavailable {
            message: "503".to_string(),
        };
        let expected = remote.to_string();
        let err = TrackingError::from(remote);
        assert_eq!(err.to_string(), expected);
        assert!(!err.is_not_found());
    }
}
