//! Remote API gateway boundary.
//!
//! The crate never speaks a wire protocol itself. A [`RemoteGateway<P>`]
//! performs the network operation for one domain and either returns records
//! or raises a [`RemoteError`]. [`InMemoryGateway`](memory::InMemoryGateway)
//! is a process-local implementation with an offline switch, used for tests
//! and for running the repositories without a backend service.

pub mod memory;

use async_trait::async_trait;

use crate::domain::{Payload, PetId, RecordId, TrackableRecord};

pub use memory::InMemoryGateway;

/// Errors raised by a [`RemoteGateway`].
///
/// Only [`RemoteError::NotFound`] is *authoritative*: the remote answered and
/// the answer is "does not exist". Everything else means the remote could not
/// answer, which is when the cache fallback applies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The remote has no such resource.
    #[error("remote resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// The request did not complete in time.
    #[error("remote request timed out")]
    Timeout,

    /// The remote could not be reached or is failing.
    #[error("remote service unavailable: {message}")]
    Unavailable {
        /// Transport- or server-provided description.
        message: String,
    },

    /// The remote refused the request.
    #[error("remote rejected request ({status}): {message}")]
    Rejected {
        /// HTTP-like status code.
        status: u16,
        /// Server-provided description.
        message: String,
    },
}

impl RemoteError {
    /// Returns `true` when the remote positively answered "does not exist".
    ///
    /// Authoritative errors must not be papered over with cached data.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the error category as a static string for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Timeout => "timeout",
            Self::Unavailable { .. } => "unavailable",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Network operations for one record domain.
#[async_trait]
pub trait RemoteGateway<P: Payload>: Send + Sync {
    /// Fetches every record of the domain owned by `pet_id`.
    async fn fetch_for_pet(&self, pet_id: &PetId) -> Result<Vec<TrackableRecord<P>>, RemoteError>;

    /// Fetches one record.
    async fn fetch(&self, id: RecordId) -> Result<TrackableRecord<P>, RemoteError>;

    /// Publishes a newly persisted record. The record already has an identity.
    async fn create(&self, record: &TrackableRecord<P>) -> Result<TrackableRecord<P>, RemoteError>;

    /// Publishes a changed record.
    async fn update(&self, record: &TrackableRecord<P>) -> Result<TrackableRecord<P>, RemoteError>;

    /// Removes a record.
    async fn delete(&self, id: RecordId) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_is_authoritative() {
        assert!(RemoteError::NotFound {
            resource: "reminder 1".to_string()
        }
        .is_authoritative());
        assert!(!RemoteError::Timeout.is_authoritative());
        assert!(!RemoteError::Rejected {
            status: 500,
            message: "boom".to_string()
        }
        .is_authoritative());
    }

    #[test]
    fn categories() {
        assert_eq!(RemoteError::Timeout.category(), "timeout");
        assert_eq!(
            RemoteError::Unavailable {
                message: String::new()
            }
            .category(),
            "unavailable"
        );
    }
}
