//! Durable record store: trait, KV-backed implementation, and backends.
//!
//! # Architecture
//!
//! 1. **[`RecordStore<P>`]** -- the interface repositories depend on, used as
//!    `Arc<dyn RecordStore<P>>`: `persist`, `get`, `query`, `delete`.
//!
//! 2. **[`KvRecordStore`]** -- all record logic (identity assignment,
//!    canonical JSON, compare-and-swap on re-persist, pet filtering) on top of
//!    any [`StorageBackend`]. One instance serves every [`Payload`] type;
//!    records are namespaced by [`RecordKind`](crate::domain::RecordKind).
//!
//! 3. **[`StorageBackend`]** -- dumb versioned KV trait
//!    ([`InMemoryBackend`](memory::InMemoryBackend) ships with the crate).
//!
//! # Identity
//!
//! A record without an identity gets the next value of its kind's sequence on
//! first persist. Identities are never reused, so two drafts persisted one
//! after the other always receive distinct identities.

pub mod backend;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

pub use backend::{StorageBackend, StorageError, VersionedRecord};

use crate::domain::{Payload, PetId, RecordId, TrackableRecord};
use crate::error::PersistenceError;
use backend::{record_key, record_prefix, sequence_name};

/// Filter for [`RecordStore::query`].
///
/// # Examples
///
/// ```
/// use pawtrack::domain::PetId;
/// use pawtrack::store::RecordFilter;
///
/// let filter = RecordFilter::for_pet(PetId::new("P2"));
/// assert_eq!(filter.pet_id.as_ref().map(PetId::as_str), Some("P2"));
/// assert!(RecordFilter::all().pet_id.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Only records owned by this pet.
    pub pet_id: Option<PetId>,
}

impl RecordFilter {
    /// Matches every record of the kind.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches records owned by `pet_id`.
    pub fn for_pet(pet_id: PetId) -> Self {
        Self {
            pet_id: Some(pet_id),
        }
    }

    fn matches<P>(&self, record: &TrackableRecord<P>) -> bool {
        self.pet_id
            .as_ref()
            .is_none_or(|pet_id| *pet_id == record.pet_id)
    }
}

/// Keyed persistence for domain records.
///
/// The only behavior the rest of the crate depends on beyond plain CRUD is
/// identity assignment: [`persist`](Self::persist) on a record without an
/// identity returns it with a fresh, never-reused identity.
#[async_trait]
pub trait RecordStore<P: Payload>: Send + Sync {
    /// Creates or overwrites a record and returns it as stored.
    ///
    /// Records carrying a non-zero `version` are written with
    /// compare-and-swap; a concurrent write in between surfaces as
    /// [`PersistenceError::Conflict`].
    async fn persist(&self, record: TrackableRecord<P>)
        -> Result<TrackableRecord<P>, PersistenceError>;

    /// Loads a record by identity.
    async fn get(&self, id: RecordId) -> Result<Option<TrackableRecord<P>>, PersistenceError>;

    /// Lists records matching `filter`, ordered by identity.
    async fn query(&self, filter: &RecordFilter)
        -> Result<Vec<TrackableRecord<P>>, PersistenceError>;

    /// Removes a record. Returns `true` if it existed.
    async fn delete(&self, id: RecordId) -> Result<bool, PersistenceError>;
}

/// [`RecordStore`] implementation over a [`StorageBackend`].
#[derive(Debug, Clone)]
pub struct KvRecordStore {
    backend: Arc<dyn StorageBackend>,
}

impl KvRecordStore {
    /// Creates a record store over `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    fn decode<P: Payload>(key: &str, record: VersionedRecord) -> Result<TrackableRecord<P>, PersistenceError> {
        let mut decoded: TrackableRecord<P> =
            serde_json::from_slice(&record.data).map_err(|source| PersistenceError::Serialization {
                key: key.to_string(),
                source,
            })?;
        decoded.version = record.version;
        Ok(decoded)
    }
}

#[async_trait]
impl<P: Payload> RecordStore<P> for KvRecordStore {
    async fn persist(
        &self,
        mut record: TrackableRecord<P>,
    ) -> Result<TrackableRecord<P>, PersistenceError> {
        let id = match record.id {
            Some(id) => id,
            None => {
                let raw = self.backend.next_sequence(&sequence_name(P::KIND)).await?;
                let id = RecordId::new(raw).ok_or_else(|| PersistenceError::Backend {
                    message: format!("sequence {} returned zero", sequence_name(P::KIND)),
                })?;
                record.id = Some(id);
                record.version = 0;
                debug!(kind = %P::KIND, %id, "assigned record identity");
                id
            },
        };

        let key = record_key(P::KIND, id);
        let bytes = serde_json::to_vec(&record).map_err(|source| PersistenceError::Serialization {
            key: key.clone(),
            source,
        })?;
        let version = if record.version == 0 {
            self.backend.put(&key, &bytes).await?
        } else {
            self.backend
                .put_if_version(&key, &bytes, record.version)
                .await?
        };
        record.version = version;
        Ok(record)
    }

    async fn get(&self, id: RecordId) -> Result<Option<TrackableRecord<P>>, PersistenceError> {
        let key = record_key(P::KIND, id);
        match self.backend.get(&key).await {
            Ok(stored) => Self::decode(&key, stored).map(Some),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn query(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<TrackableRecord<P>>, PersistenceError> {
        let listed = self.backend.list_by_prefix(&record_prefix(P::KIND)).await?;
        let mut records = Vec::with_capacity(listed.len());
        for (key, stored) in listed {
            let record: TrackableRecord<P> = Self::decode(&key, stored)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    async fn delete(&self, id: RecordId) -> Result<bool, PersistenceError> {
        Ok(self.backend.delete(&record_key(P::KIND, id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CareCategory, CareInstruction, Reminder, ReminderKind};
    use memory::InMemoryBackend;
    use pretty_assertions::assert_eq;

    fn store() -> KvRecordStore {
        KvRecordStore::new(Arc::new(InMemoryBackend::new()))
    }

    fn care(pet: &str, title: &str) -> TrackableRecord<CareInstruction> {
        TrackableRecord::new(
            PetId::new(pet),
            CareInstruction {
                category: CareCategory::General,
                title: title.to_string(),
                content: String::new(),
            },
        )
    }

    #[tokio::test]
    async fn persist_assigns_distinct_identities() {
        let store = store();
        let a = store.persist(care("P1", "a")).await.unwrap();
        let b = store.persist(care("P1", "b")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.version, 1);
        assert_eq!(b.version, 1);
    }

    #[tokio::test]
    async fn identities_are_sequenced_per_kind() {
        let store = store();
        let care = store.persist(care("P1", "a")).await.unwrap();
        let reminder = store
            .persist(TrackableRecord::new(
                PetId::new("P1"),
                Reminder::new(ReminderKind::Custom, "r", None),
            ))
            .await
            .unwrap();
        assert_eq!(care.id, RecordId::new(1));
        assert_eq!(reminder.id, RecordId::new(1));
        let loaded: Option<TrackableRecord<CareInstruction>> =
            store.get(RecordId::new(1).unwrap()).await.unwrap();
        assert_eq!(loaded.unwrap().payload.title, "a");
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let store = store();
        let first = store.persist(care("P1", "a")).await.unwrap();
        let mut stale = first.clone();

        let mut fresh = first;
        fresh.payload.title = "b".to_string();
        store.persist(fresh).await.unwrap();

        stale.payload.title = "c".to_string();
        let err = store.persist(stale).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn query_filters_by_pet_and_orders_by_identity() {
        let store = store();
        for (pet, title) in [("P1", "a"), ("P2", "b"), ("P1", "c")] {
            store.persist(care(pet, title)).await.unwrap();
        }
        let p1: Vec<TrackableRecord<CareInstruction>> = store
            .query(&RecordFilter::for_pet(PetId::new("P1")))
            .await
            .unwrap();
        let titles: Vec<_> = p1.iter().map(|r| r.payload.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);

        let all: Vec<TrackableRecord<CareInstruction>> =
            store.query(&RecordFilter::all()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn delete_then_get_is_none() {
        let store = store();
        let record = store.persist(care("P1", "a")).await.unwrap();
        let id = record.id.unwrap();
        assert!(RecordStore::<CareInstruction>::delete(&store, id).await.unwrap());
        let loaded: Option<TrackableRecord<CareInstruction>> = store.get(id).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn backend_failures_surface_as_persistence_errors() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = KvRecordStore::new(backend.clone());
        backend.set_unavailable(true);
        let err = store.persist(care("P1", "a")).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Backend { .. }));
    }
}
