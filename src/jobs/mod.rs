//! Delayed notification jobs.
//!
//! A [`JobExecutor`] runs at most one job per key. Jobs are keyed
//! `{kind}:{id}` and tagged `{kind}-tag:{id}`, so a reminder with identity 5
//! lives under `reminder:5` / `reminder-tag:5`. When a job fires the executor
//! hands it to a [`NotificationSink`].
//!
//! [`LocalJobExecutor`] is the in-process implementation: one tokio task per
//! job, replaced atomically when a key is resubmitted.

pub mod local;
pub mod sink;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::JOB_TAG_SUFFIX;
use crate::domain::{PetId, RecordId, RecordKind};

pub use local::LocalJobExecutor;
pub use sink::{ChannelSink, LoggingSink, NotificationSink};

/// Unique job key for a record: `{kind}:{id}`.
///
/// # Examples
///
/// ```
/// use pawtrack::domain::{RecordId, RecordKind};
/// use pawtrack::jobs::{job_key, job_tag, parse_job_key};
///
/// let id = RecordId::new(5).unwrap();
/// assert_eq!(job_key(RecordKind::Reminder, id), "reminder:5");
/// assert_eq!(job_tag(RecordKind::Reminder, id), "reminder-tag:5");
/// assert_eq!(parse_job_key("reminder:5"), Some((RecordKind::Reminder, id)));
/// ```
pub fn job_key(kind: RecordKind, id: RecordId) -> String {
    format!("{kind}:{id}")
}

/// Bulk-cancellation tag for a record: `{kind}-tag:{id}`.
pub fn job_tag(kind: RecordKind, id: RecordId) -> String {
    format!("{kind}{JOB_TAG_SUFFIX}:{id}")
}

/// Splits a job key back into kind and identity.
pub fn parse_job_key(key: &str) -> Option<(RecordKind, RecordId)> {
    let (kind, id) = key.split_once(':')?;
    Some((RecordKind::from_name(kind)?, id.parse().ok()?))
}

/// What the user sees when a job fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Notification title.
    pub title: String,
    /// Notification body; may be empty.
    pub body: String,
    /// The pet the reminder is about.
    pub pet_id: PetId,
}

/// Whether a submission replaces an existing job under the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingJobPolicy {
    /// Cancel the existing job and run the new one.
    #[default]
    Replace,
    /// Leave the existing job alone and drop the submission.
    Keep,
}

/// A request to run a notification after a delay.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    /// Unique key; at most one job per key is active.
    pub key: String,
    /// Tag for bulk cancellation.
    pub tag: String,
    /// Wall-clock instant the delay was computed for.
    pub fire_at: DateTime<Utc>,
    /// How long to wait before firing.
    pub delay: Duration,
    /// Notification content.
    pub payload: NotificationPayload,
    /// Handling of an existing job under `key`.
    pub policy: ExistingJobPolicy,
}

/// An accepted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJob {
    /// Unique key.
    pub key: String,
    /// Bulk-cancellation tag.
    pub tag: String,
    /// Wall-clock instant the job fires at.
    pub fire_at: DateTime<Utc>,
    /// Notification content.
    pub payload: NotificationPayload,
    /// Distinguishes successive submissions under one key.
    pub run_id: Uuid,
}

impl NotificationJob {
    /// Kind and identity of the record this job belongs to.
    pub fn target(&self) -> Option<(RecordKind, RecordId)> {
        parse_job_key(&self.key)
    }
}

/// Job executor failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// The executor refused the request.
    #[error("job {key} rejected: {message}")]
    Rejected {
        /// Key of the refused job.
        key: String,
        /// Reason.
        message: String,
    },

    /// The executor no longer accepts work.
    #[error("job executor is shut down")]
    ShutDown,
}

/// Runs delayed notification jobs.
#[async_trait]
pub trait JobExecutor: Send + Sync + std::fmt::Debug {
    /// Submits a job. Returns the job that is active for the key afterwards.
    async fn submit(&self, request: JobRequest) -> Result<NotificationJob, JobError>;

    /// Cancels the job under `key`. Returns `true` if one was active.
    async fn cancel_by_key(&self, key: &str) -> Result<bool, JobError>;

    /// Cancels every job carrying `tag`. Returns how many were active.
    async fn cancel_by_tag(&self, tag: &str) -> Result<usize, JobError>;

    /// The active job under `key`, if any.
    async fn active(&self, key: &str) -> Option<NotificationJob>;

    /// Every active job, in no particular order.
    async fn active_jobs(&self) -> Vec<NotificationJob>;

    /// Returns `true` when [`ExistingJobPolicy::Replace`] swaps jobs in one
    /// step, with no window where neither or both are active.
    fn supports_atomic_replace(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_and_tags_carry_the_kind() {
        let id = RecordId::new(12).unwrap();
        assert_eq!(job_key(RecordKind::Health, id), "health:12");
        assert_eq!(job_tag(RecordKind::Care, id), "care-tag:12");
        assert_ne!(job_key(RecordKind::Health, id), job_key(RecordKind::Reminder, id));
    }

    #[test]
    fn malformed_keys_do_not_parse() {
        assert_eq!(parse_job_key("reminder"), None);
        assert_eq!(parse_job_key("walk:3"), None);
        assert_eq!(parse_job_key("reminder:0"), None);
        assert_eq!(parse_job_key("reminder:x"), None);
    }
}
