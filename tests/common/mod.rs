//! Shared fixture for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc::UnboundedReceiver;

use pawtrack::clock::ManualClock;
use pawtrack::config::TrackingConfig;
use pawtrack::domain::{CareInstruction, HealthEntry, Reminder, StatusUpdate};
use pawtrack::jobs::{ChannelSink, LocalJobExecutor, NotificationJob};
use pawtrack::remote::InMemoryGateway;
use pawtrack::repository::{Gateways, TrackingServices};
use pawtrack::store::memory::InMemoryBackend;

/// Services over in-memory parts, with handles to every part.
pub struct Fixture {
    pub services: TrackingServices,
    pub clock: Arc<ManualClock>,
    pub backend: Arc<InMemoryBackend>,
    pub executor: Arc<LocalJobExecutor>,
    pub fired: UnboundedReceiver<NotificationJob>,
    pub health: Arc<InMemoryGateway<HealthEntry>>,
    pub reminders: Arc<InMemoryGateway<Reminder>>,
    pub status: Arc<InMemoryGateway<StatusUpdate>>,
    pub care: Arc<InMemoryGateway<CareInstruction>>,
}

/// Fixed starting instant for the manual clock.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 8, 30, 0).unwrap()
}

pub fn fixture() -> Fixture {
    fixture_with(TrackingConfig::default())
}

pub fn fixture_with(config: TrackingConfig) -> Fixture {
    let clock = Arc::new(ManualClock::new(start()));
    let backend = Arc::new(InMemoryBackend::new());
    let (sink, fired) = ChannelSink::new();
    let executor = Arc::new(LocalJobExecutor::new(Arc::new(sink)));
    let health = Arc::new(InMemoryGateway::new());
    let reminders = Arc::new(InMemoryGateway::new());
    let status = Arc::new(InMemoryGateway::new());
    let care = Arc::new(InMemoryGateway::new());

    let services = TrackingServices::new(
        &config,
        backend.clone(),
        Gateways {
            health: health.clone(),
            reminders: reminders.clone(),
            status: status.clone(),
            care: care.clone(),
        },
        executor.clone(),
        clock.clone(),
    )
    .unwrap();

    Fixture {
        services,
        clock,
        backend,
        executor,
        fired,
        health,
        reminders,
        status,
        care,
    }
}
