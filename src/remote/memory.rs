//! Process-local remote gateway.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::{Payload, PetId, RecordId, TrackableRecord};
use crate::remote::{RemoteError, RemoteGateway};

/// A [`RemoteGateway`] backed by a `DashMap`.
///
/// Behaves like a well-mannered remote API: `create` requires an identity,
/// `update` requires the record to exist, and lookups of unknown identities
/// answer [`RemoteError::NotFound`]. Two switches simulate trouble:
/// [`set_offline`](Self::set_offline) fails every call with
/// [`RemoteError::Unavailable`], and [`fail_next`](Self::fail_next) queues
/// errors for the next calls.
///
/// # Examples
///
/// ```
/// use pawtrack::domain::CareInstruction;
/// use pawtrack::remote::InMemoryGateway;
///
/// let gateway = InMemoryGateway::<CareInstruction>::new();
/// gateway.set_offline(true);
/// assert!(gateway.is_offline());
/// ```
#[derive(Debug)]
pub struct InMemoryGateway<P> {
    records: DashMap<RecordId, TrackableRecord<P>>,
    offline: AtomicBool,
    queued_failures: Mutex<VecDeque<RemoteError>>,
    calls: AtomicUsize,
}

impl<P: Payload> InMemoryGateway<P> {
    /// Creates an empty, online gateway.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            offline: AtomicBool::new(false),
            queued_failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Switches the simulated network on or off.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns `true` while offline.
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Makes the next call fail with `error`. Queued errors are consumed in
    /// order, one per call.
    pub fn fail_next(&self, error: RemoteError) {
        self.queued_failures.lock().push_back(error);
    }

    /// Seeds a record directly, bypassing the failure switches.
    pub fn seed(&self, record: TrackableRecord<P>) {
        if let Some(id) = record.id {
            self.records.insert(id, Self::detach(record));
        }
    }

    /// Returns the remote copy of a record, bypassing the failure switches.
    pub fn snapshot(&self, id: RecordId) -> Option<TrackableRecord<P>> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of calls made through the [`RemoteGateway`] interface.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.queued_failures.lock().pop_front() {
            return Err(error);
        }
        if self.is_offline() {
            return Err(RemoteError::Unavailable {
                message: "network unreachable".to_string(),
            });
        }
        Ok(())
    }

    // The remote has no notion of the local store version.
    fn detach(mut record: TrackableRecord<P>) -> TrackableRecord<P> {
        record.version = 0;
        record
    }

    fn not_found(id: RecordId) -> RemoteError {
        RemoteError::NotFound {
            resource: format!("{} {id}", P::KIND),
        }
    }
}

impl<P: Payload> Default for InMemoryGateway<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Payload> RemoteGateway<P> for InMemoryGateway<P> {
    async fn fetch_for_pet(&self, pet_id: &PetId) -> Result<Vec<TrackableRecord<P>>, RemoteError> {
        self.enter()?;
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|entry| entry.value().pet_id == *pet_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    async fn fetch(&self, id: RecordId) -> Result<TrackableRecord<P>, RemoteError> {
        self.enter()?;
        self.snapshot(id).ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, record: &TrackableRecord<P>) -> Result<TrackableRecord<P>, RemoteError> {
        self.enter()?;
        let id = record.id.ok_or_else(|| RemoteError::Rejected {
            status: 422,
            message: format!("{} without identity", P::KIND),
        })?;
        let stored = Self::detach(record.clone());
        self.records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &TrackableRecord<P>) -> Result<TrackableRecord<P>, RemoteError> {
        self.enter()?;
        let id = record.id.ok_or_else(|| RemoteError::Rejected {
            status: 422,
            message: format!("{} without identity", P::KIND),
        })?;
        let mut entry = self.records.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        let stored = Self::detach(record.clone());
        *entry.value_mut() = stored.clone();
        Ok(stored)
    }

    async fn delete(&self, id: RecordId) -> Result<(), RemoteError> {
        self.enter()?;
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mood, StatusUpdate};

    fn update(id: u64, pet: &str) -> TrackableRecord<StatusUpdate> {
        let mut record =
            TrackableRecord::new(PetId::new(pet), StatusUpdate::new(Mood::Happy, "settling in"));
        record.id = RecordId::new(id);
        record.version = 4;
        record
    }

    #[tokio::test]
    async fn create_requires_identity_and_drops_version() {
        let gateway = InMemoryGateway::new();
        let mut draft = update(1, "P1");
        draft.id = None;
        assert!(matches!(
            gateway.create(&draft).await,
            Err(RemoteError::Rejected { status: 422, .. })
        ));

        let created = gateway.create(&update(1, "P1")).await.unwrap();
        assert_eq!(created.version, 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let gateway = InMemoryGateway::<StatusUpdate>::new();
        let id = RecordId::new(9).unwrap();
        assert!(gateway.fetch(id).await.unwrap_err().is_authoritative());
        assert!(gateway.update(&update(9, "P1")).await.is_err());
        assert!(gateway.delete(id).await.unwrap_err().is_authoritative());
    }

    #[tokio::test]
    async fn queued_failures_come_before_offline_state() {
        let gateway = InMemoryGateway::new();
        gateway.seed(update(1, "P1"));
        gateway.fail_next(RemoteError::Timeout);

        let pet = PetId::new("P1");
        assert_eq!(gateway.fetch_for_pet(&pet).await, Err(RemoteError::Timeout));
        assert_eq!(gateway.fetch_for_pet(&pet).await.unwrap().len(), 1);

        gateway.set_offline(true);
        assert!(matches!(
            gateway.fetch_for_pet(&pet).await,
            Err(RemoteError::Unavailable { .. })
        ));
        assert_eq!(gateway.call_count(), 3);
    }
}
