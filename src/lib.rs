//! Remote-first data access and reminder scheduling for post-adoption pet
//! tracking.
//!
//! # Overview
//!
//! Four record domains (health records, reminders, status updates and care
//! instructions) share one lifecycle: a record is persisted locally, which
//! assigns its identity, then published to a remote API. Reads go to the
//! remote first and fall back to the last successfully fetched value when the
//! remote cannot answer. Reminders with a future trigger time keep exactly one
//! notification job; completing, rescheduling or deleting them keeps the job
//! in step.
//!
//! # Module Organization
//!
//! - [`domain`] - Record envelope, per-domain payloads, lenient enum parsing
//! - [`store`] - Durable record store over a versioned key-value backend
//! - [`remote`] - Remote gateway trait and an in-memory implementation
//! - [`cache`] - Cache store, per-key locks and the cache-fallback accessor
//! - [`jobs`] - Notification job executor and sinks
//! - [`scheduler`] - Keeps jobs in step with reminder trigger times
//! - [`repository`] - Per-domain facades and service wiring
//! - [`config`] - TOML and environment configuration
//! - [`error`] - Facade and persistence error types
//!
//! # Example
//!
//! ```
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use pawtrack::clock::SystemClock;
//! use pawtrack::config::TrackingConfig;
//! use pawtrack::domain::{PetId, Reminder, ReminderKind, ReminderState, TrackableRecord};
//! use pawtrack::jobs::{LocalJobExecutor, LoggingSink};
//! use pawtrack::remote::InMemoryGateway;
//! use pawtrack::repository::{Gateways, TrackingServices};
//! use pawtrack::store::memory::InMemoryBackend;
//!
//! let services = TrackingServices::new(
//!     &TrackingConfig::default(),
//!     Arc::new(InMemoryBackend::new()),
//!     Gateways {
//!         health: Arc::new(InMemoryGateway::new()),
//!         reminders: Arc::new(InMemoryGateway::new()),
//!         status: Arc::new(InMemoryGateway::new()),
//!         care: Arc::new(InMemoryGateway::new()),
//!     },
//!     Arc::new(LocalJobExecutor::new(Arc::new(LoggingSink))),
//!     Arc::new(SystemClock),
//! )
//! .unwrap();
//!
//! let draft = TrackableRecord::new(
//!     PetId::new("P1"),
//!     Reminder::new(ReminderKind::Medication, "Heartworm pill", Some(Utc::now() + Duration::days(1))),
//! );
//! let reminder = services.reminders.create(draft).await.unwrap();
//! let id = reminder.id.unwrap();
//! assert_eq!(services.reminders.state(id).await.unwrap(), ReminderState::Scheduled);
//!
//! services.reminders.mark_complete(id).await.unwrap();
//! assert_eq!(services.reminders.state(id).await.unwrap(), ReminderState::Completed);
//! # });
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod jobs;
#[cfg(feature = "logging")]
pub mod logging;
pub mod remote;
pub mod repository;
pub mod scheduler;
pub mod store;

// Re-exports for ergonomic access
pub use cache::{CacheFallbackAccessor, CacheScope, CacheStore, Fetched, KeyedLocks};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, TrackingConfig};
pub use domain::{PetId, RecordId, RecordKind, TrackableRecord};
pub use error::{PersistenceError, TrackingError};
pub use jobs::{JobExecutor, LocalJobExecutor, NotificationJob, NotificationSink};
pub use remote::{RemoteError, RemoteGateway};
pub use repository::{
    CareRepository, Gateways, HealthRepository, ReminderRepository, StatusRepository,
    TrackedRepository, TrackingServices,
};
pub use scheduler::{ReminderScheduler, ScheduleOutcome, SkipReason};
pub use store::{KvRecordStore, RecordStore, StorageBackend};
