//! Domain repository facades.
//!
//! Every domain gets the same contract from [`TrackedRepository<P>`]:
//!
//! | Operation | Path |
//! |---|---|
//! | [`create`](TrackedRepository::create) | persist locally, publish remotely, write through to cache, schedule |
//! | [`get`](TrackedRepository::get), [`list_for_pet`](TrackedRepository::list_for_pet) | remote first, cache fallback |
//! | [`update`](TrackedRepository::update) | load, patch, publish, re-persist, write through, reschedule |
//! | [`delete`](TrackedRepository::delete) | remove locally, cancel, evict, remove remotely |
//!
//! Writes to one identity are serialized by a per-entity lock. Locks are
//! always taken in the order entity, scheduler key, cache scope.
//!
//! The domain-specific operations live on the concrete instantiations
//! ([`ReminderRepository`], [`StatusRepository`], [`HealthRepository`],
//! [`CareRepository`]). [`TrackingServices`] wires all four together.

pub mod care;
pub mod health;
pub mod reminder;
pub mod status;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheError, CacheFallbackAccessor, CacheScope, CacheStore, Fetched, KeyedLocks};
use crate::clock::Clock;
use crate::config::{ParsingConfig, TrackingConfig};
use crate::domain::{
    CareInstruction, HealthEntry, Payload, PetId, RecordId, Reminder, StatusUpdate,
    TrackableRecord,
};
use crate::error::{PersistenceError, Result, TrackingError};
use crate::jobs::JobExecutor;
use crate::remote::{RemoteError, RemoteGateway};
use crate::scheduler::{ReminderScheduler, ScheduleOutcome};
use crate::store::{KvRecordStore, RecordFilter, RecordStore, StorageBackend};

/// Repository for health records.
pub type HealthRepository = TrackedRepository<HealthEntry>;
/// Repository for reminders.
pub type ReminderRepository = TrackedRepository<Reminder>;
/// Repository for status updates.
pub type StatusRepository = TrackedRepository<StatusUpdate>;
/// Repository for care instructions.
pub type CareRepository = TrackedRepository<CareInstruction>;

/// Remote-first repository for one record domain.
pub struct TrackedRepository<P: Payload> {
    store: Arc<dyn RecordStore<P>>,
    remote: Arc<dyn RemoteGateway<P>>,
    accessor: CacheFallbackAccessor,
    scheduler: Arc<ReminderScheduler>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks,
}

impl<P: Payload> Clone for TrackedRepository<P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            remote: Arc::clone(&self.remote),
            accessor: self.accessor.clone(),
            scheduler: Arc::clone(&self.scheduler),
            clock: Arc::clone(&self.clock),
            locks: self.locks.clone(),
        }
    }
}

impl<P: Payload> fmt::Debug for TrackedRepository<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedRepository")
            .field("kind", &P::KIND)
            .field("locked_entities", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl<P: Payload> TrackedRepository<P> {
    /// Creates a repository from its collaborators.
    pub fn new(
        store: Arc<dyn RecordStore<P>>,
        remote: Arc<dyn RemoteGateway<P>>,
        accessor: CacheFallbackAccessor,
        scheduler: Arc<ReminderScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            remote,
            accessor,
            scheduler,
            clock,
            locks: KeyedLocks::new(),
        }
    }

    /// The scheduler shared with the other repositories.
    pub fn scheduler(&self) -> &Arc<ReminderScheduler> {
        &self.scheduler
    }

    /// Persists a new record, publishes it and schedules its reminder.
    ///
    /// Fails with [`TrackingError::AlreadyPersisted`] if `draft` already has
    /// an identity. If the remote rejects the record, the local copy is
    /// removed again and the remote error is returned.
    #[instrument(skip_all, fields(kind = %P::KIND, pet_id = %draft.pet_id))]
    pub async fn create(&self, draft: TrackableRecord<P>) -> Result<TrackableRecord<P>> {
        if let Some(id) = draft.id {
            return Err(TrackingError::AlreadyPersisted { kind: P::KIND, id });
        }

        let record = self.store.persist(draft).await?;
        let id = persisted_id(&record)?;
        let _guard = self.locks.lock(&entity_key::<P>(id)).await;

        if let Err(err) = self.remote.create(&record).await {
            warn!(%id, error = %err, "remote create failed; removing local copy");
            if let Err(cleanup) = self.store.delete(id).await {
                warn!(%id, error = %cleanup, "failed to remove local copy after remote failure");
            }
            return Err(err.into());
        }

        self.write_through(&record).await;
        self.sync_schedule(&record).await?;
        info!(%id, "record created");
        Ok(record)
    }

    /// Reads one record, remote first with cache fallback.
    ///
    /// A remote "not found" surfaces as [`TrackingError::NotFound`].
    pub async fn get(&self, id: RecordId) -> Result<TrackableRecord<P>> {
        self.get_with_source(id).await.map(|fetched| fetched.value)
    }

    /// Like [`get`](Self::get), but reports whether the value is live.
    pub async fn get_with_source(&self, id: RecordId) -> Result<Fetched<TrackableRecord<P>>> {
        let scope = CacheScope::for_record(P::KIND, id);
        self.accessor
            .fetch_with_source(&scope, || self.remote.fetch(id))
            .await
            .map_err(|err| not_found_or::<P>(err, id))
    }

    /// Reads every record owned by `pet_id`, remote first with cache
    /// fallback.
    pub async fn list_for_pet(&self, pet_id: &PetId) -> Result<Vec<TrackableRecord<P>>> {
        self.list_for_pet_with_source(pet_id)
            .await
            .map(|fetched| fetched.value)
    }

    /// Like [`list_for_pet`](Self::list_for_pet), but reports whether the
    /// list is live.
    pub async fn list_for_pet_with_source(
        &self,
        pet_id: &PetId,
    ) -> Result<Fetched<Vec<TrackableRecord<P>>>> {
        let scope = CacheScope::for_pet(P::KIND, pet_id);
        Ok(self
            .accessor
            .fetch_with_source(&scope, || self.remote.fetch_for_pet(pet_id))
            .await?)
    }

    /// Records owned by `pet_id` in the local store only.
    pub async fn list_local(&self, pet_id: &PetId) -> Result<Vec<TrackableRecord<P>>> {
        Ok(self
            .store
            .query(&RecordFilter::for_pet(pet_id.clone()))
            .await?)
    }

    /// The local copy of a record, if any.
    pub async fn local(&self, id: RecordId) -> Result<Option<TrackableRecord<P>>> {
        Ok(self.store.get(id).await?)
    }

    /// Applies `patch` to a record's payload and propagates the change.
    ///
    /// The remote is updated before the local copy is re-persisted, so a
    /// remote failure leaves the local store untouched.
    #[instrument(skip(self, patch), fields(kind = %P::KIND, id = id.get()))]
    pub async fn update<F>(&self, id: RecordId, patch: F) -> Result<TrackableRecord<P>>
    where
        F: FnOnce(&mut P) + Send,
    {
        let updated = self
            .apply(id, |payload| {
                patch(payload);
                true
            })
            .await?;
        match updated {
            Some(record) => Ok(record),
            None => self.get(id).await,
        }
    }

    /// Removes a record everywhere and cancels its reminder.
    ///
    /// The remote is asked first; a remote "not found" counts as already
    /// deleted. Any other remote failure leaves the local copy, its job and
    /// the cache untouched. Deleting an unknown record is not an error.
    #[instrument(skip(self), fields(kind = %P::KIND, id = id.get()))]
    pub async fn delete(&self, id: RecordId) -> Result<()> {
        let _guard = self.locks.lock(&entity_key::<P>(id)).await;

        match self.remote.delete(id).await {
            Ok(()) => {},
            Err(err) if err.is_authoritative() => {
                debug!(%id, "remote copy already gone");
            },
            Err(err) => {
                warn!(%id, error = %err, "remote delete failed; local copy kept");
                return Err(err.into());
            },
        }

        let local = self.store.get(id).await?;
        let pet_id = match &local {
            Some(record) => Some(record.pet_id.clone()),
            None => self.cached_pet_of(id).await,
        };
        if local.is_some() {
            self.store.delete(id).await?;
        }

        self.scheduler.cancel(P::KIND, Some(id)).await?;
        self.evict(id, pet_id.as_ref()).await;
        info!(%id, "record deleted");
        Ok(())
    }

    /// Changes a payload under the entity lock.
    ///
    /// `change` returns `false` to leave the record as it is; the result is
    /// then `None` and nothing is written.
    pub(crate) async fn apply<F>(&self, id: RecordId, change: F) -> Result<Option<TrackableRecord<P>>>
    where
        F: FnOnce(&mut P) -> bool + Send,
    {
        let _guard = self.locks.lock(&entity_key::<P>(id)).await;

        let mut record = self.load_current(id).await?;
        if !change(&mut record.payload) {
            debug!(%id, "change not applicable; record left as is");
            return Ok(None);
        }

        self.remote
            .update(&record)
            .await
            .map_err(|err| not_found_or::<P>(err, id))?;
        let record = self.store.persist(record).await?;

        self.write_through(&record).await;
        self.sync_schedule(&record).await?;
        debug!(%id, version = record.version, "record updated");
        Ok(Some(record))
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    async fn load_current(&self, id: RecordId) -> Result<TrackableRecord<P>> {
        match self.store.get(id).await? {
            Some(record) => Ok(record),
            None => self.get(id).await,
        }
    }

    async fn sync_schedule(&self, record: &TrackableRecord<P>) -> Result<Option<ScheduleOutcome>> {
        let Some(plan) = record.payload.reminder_plan() else {
            return Ok(None);
        };
        let outcome = self
            .scheduler
            .apply_plan(P::KIND, record.id, &record.pet_id, &plan)
            .await?;
        Ok(Some(outcome))
    }

    async fn write_through(&self, record: &TrackableRecord<P>) {
        let Some(id) = record.id else {
            return;
        };
        let cache = self.accessor.cache();
        if let Err(err) = cache.write(&CacheScope::for_record(P::KIND, id), record).await {
            log_cache_failure(&err, id, "write-through");
        }
        let upsert = record.clone();
        let pet_scope = CacheScope::for_pet(P::KIND, &record.pet_id);
        let result = cache
            .modify(&pet_scope, move |list: &mut Vec<TrackableRecord<P>>| {
                match list.iter_mut().find(|item| item.id == upsert.id) {
                    Some(item) => *item = upsert,
                    None => {
                        list.push(upsert);
                        list.sort_by_key(|item| item.id);
                    },
                }
            })
            .await;
        if let Err(err) = result {
            log_cache_failure(&err, id, "pet list write-through");
        }
    }

    async fn evict(&self, id: RecordId, pet_id: Option<&PetId>) {
        let cache = self.accessor.cache();
        if let Err(err) = cache.evict(&CacheScope::for_record(P::KIND, id)).await {
            log_cache_failure(&err, id, "eviction");
        }
        let Some(pet_id) = pet_id else {
            return;
        };
        let result = cache
            .modify(
                &CacheScope::for_pet(P::KIND, pet_id),
                move |list: &mut Vec<TrackableRecord<P>>| list.retain(|item| item.id != Some(id)),
            )
            .await;
        if let Err(err) = result {
            log_cache_failure(&err, id, "pet list eviction");
        }
    }

    async fn cached_pet_of(&self, id: RecordId) -> Option<PetId> {
        self.accessor
            .cache()
            .read::<TrackableRecord<P>>(&CacheScope::for_record(P::KIND, id))
            .await
            .ok()
            .flatten()
            .map(|entry| entry.value.pet_id)
    }
}

fn entity_key<P: Payload>(id: RecordId) -> String {
    format!("{}:{id}", P::KIND)
}

fn persisted_id<P: Payload>(record: &TrackableRecord<P>) -> Result<RecordId> {
    record.id.ok_or_else(|| {
        PersistenceError::Backend {
            message: format!("store returned {} without identity", P::KIND),
        }
        .into()
    })
}

fn not_found_or<P: Payload>(err: RemoteError, id: RecordId) -> TrackingError {
    if err.is_authoritative() {
        TrackingError::NotFound { kind: P::KIND, id }
    } else {
        err.into()
    }
}

fn log_cache_failure(err: &CacheError, id: RecordId, step: &'static str) {
    warn!(%id, step, error = %err, "cache maintenance failed");
}

/// Remote gateways for the four domains.
#[derive(Clone)]
pub struct Gateways {
    /// Health records.
    pub health: Arc<dyn RemoteGateway<HealthEntry>>,
    /// Reminders.
    pub reminders: Arc<dyn RemoteGateway<Reminder>>,
    /// Status updates.
    pub status: Arc<dyn RemoteGateway<StatusUpdate>>,
    /// Care instructions.
    pub care: Arc<dyn RemoteGateway<CareInstruction>>,
}

impl fmt::Debug for Gateways {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateways").finish_non_exhaustive()
    }
}

/// All four repositories over one storage backend, cache and scheduler.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pawtrack::clock::SystemClock;
/// use pawtrack::config::TrackingConfig;
/// use pawtrack::jobs::{LocalJobExecutor, LoggingSink};
/// use pawtrack::remote::InMemoryGateway;
/// use pawtrack::repository::{Gateways, TrackingServices};
/// use pawtrack::store::memory::InMemoryBackend;
///
/// let services = TrackingServices::new(
///     &TrackingConfig::default(),
///     Arc::new(InMemoryBackend::new()),
///     Gateways {
///         health: Arc::new(InMemoryGateway::new()),
///         reminders: Arc::new(InMemoryGateway::new()),
///         status: Arc::new(InMemoryGateway::new()),
///         care: Arc::new(InMemoryGateway::new()),
///     },
///     Arc::new(LocalJobExecutor::new(Arc::new(LoggingSink))),
///     Arc::new(SystemClock),
/// )
/// .unwrap();
/// assert!(services.cache.is_ready());
/// ```
#[derive(Debug, Clone)]
pub struct TrackingServices {
    /// Health records.
    pub health: HealthRepository,
    /// Reminders.
    pub reminders: ReminderRepository,
    /// Status updates.
    pub status: StatusRepository,
    /// Care instructions.
    pub care: CareRepository,
    /// Shared reminder scheduler.
    pub scheduler: Arc<ReminderScheduler>,
    /// Shared cache store, already initialized.
    pub cache: Arc<CacheStore>,
    /// Policy for enum values arriving from outside.
    pub parsing: ParsingConfig,
}

impl TrackingServices {
    /// Builds and initializes every component.
    pub fn new(
        config: &TrackingConfig,
        backend: Arc<dyn StorageBackend>,
        gateways: Gateways,
        executor: Arc<dyn JobExecutor>,
        clock: Arc<dyn Clock>,
    ) -> std::result::Result<Self, CacheError> {
        let cache = Arc::new(CacheStore::new(
            Arc::clone(&backend),
            Arc::clone(&clock),
            &config.cache,
        ));
        cache.init()?;
        let accessor = CacheFallbackAccessor::new(Arc::clone(&cache));
        let scheduler = Arc::new(ReminderScheduler::new(
            executor,
            Arc::clone(&clock),
            config.scheduler.clone(),
        ));
        let store = Arc::new(KvRecordStore::new(backend));

        Ok(Self {
            health: TrackedRepository::new(
                store.clone(),
                gateways.health,
                accessor.clone(),
                Arc::clone(&scheduler),
                Arc::clone(&clock),
            ),
            reminders: TrackedRepository::new(
                store.clone(),
                gateways.reminders,
                accessor.clone(),
                Arc::clone(&scheduler),
                Arc::clone(&clock),
            ),
            status: TrackedRepository::new(
                store.clone(),
                gateways.status,
                accessor.clone(),
                Arc::clone(&scheduler),
                Arc::clone(&clock),
            ),
            care: TrackedRepository::new(store, gateways.care, accessor, Arc::clone(&scheduler), clock),
            scheduler,
            cache,
            parsing: config.parsing,
        })
    }
}
