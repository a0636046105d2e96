//! Destinations for fired jobs.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::jobs::NotificationJob;

/// Receives jobs when they fire.
#[async_trait]
pub trait NotificationSink: Send + Sync + std::fmt::Debug {
    /// Delivers a fired job. Delivery failures are the sink's to handle.
    async fn deliver(&self, job: NotificationJob);
}

/// Writes fired jobs to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, job: NotificationJob) {
        info!(
            key = %job.key,
            pet_id = %job.payload.pet_id,
            title = %job.payload.title,
            fire_at = %job.fire_at,
            "notification fired"
        );
    }
}

/// Forwards fired jobs to an unbounded channel.
///
/// # Examples
///
/// ```
/// use pawtrack::jobs::ChannelSink;
///
/// let (sink, mut fired) = ChannelSink::new();
/// drop(sink);
/// assert!(fired.try_recv().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<NotificationJob>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that observes fired jobs.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, job: NotificationJob) {
        if let Err(err) = self.tx.send(job) {
            warn!(key = %err.0.key, "notification receiver dropped; job discarded");
        }
    }
}
