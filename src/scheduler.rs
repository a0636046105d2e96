//! Reminder scheduling.
//!
//! [`ReminderScheduler`] turns "this record wants a notification at T" into
//! exactly one job on a [`JobExecutor`], and "this record no longer wants
//! one" into zero jobs. Both directions are idempotent:
//!
//! - a future trigger leaves exactly one job under `{kind}:{id}`, carrying
//!   the latest trigger;
//! - an absent or past trigger, or a cancel, leaves none.
//!
//! Calls for the same key are serialized, so concurrent reschedules of one
//! reminder cannot interleave their cancel and enqueue steps.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

use crate::cache::KeyedLocks;
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::domain::{PetId, RecordId, RecordKind, ReminderPlan};
use crate::jobs::{
    job_key, job_tag, ExistingJobPolicy, JobError, JobExecutor, JobRequest, NotificationJob,
    NotificationPayload,
};

/// Why [`ReminderScheduler::schedule`] did not enqueue a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The record has no identity yet.
    NoIdentity,
    /// The record has no trigger time.
    NoTrigger,
    /// The trigger time is not far enough in the future.
    NotInFuture {
        /// The rejected trigger time.
        trigger: DateTime<Utc>,
    },
    /// The record is completed.
    Completed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoIdentity => f.write_str("record has no identity"),
            Self::NoTrigger => f.write_str("no trigger time"),
            Self::NotInFuture { trigger } => write!(f, "trigger {trigger} is not in the future"),
            Self::Completed => f.write_str("record is completed"),
        }
    }
}

/// Result of a [`ReminderScheduler::schedule`] call. Skipping is a success.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleOutcome {
    /// The job now active for the record.
    Scheduled(NotificationJob),
    /// No job was enqueued; any previous job for the record is gone.
    Skipped(SkipReason),
}

impl ScheduleOutcome {
    /// The scheduled job, if any.
    pub fn job(&self) -> Option<&NotificationJob> {
        match self {
            Self::Scheduled(job) => Some(job),
            Self::Skipped(_) => None,
        }
    }

    /// Returns `true` for [`ScheduleOutcome::Scheduled`].
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Self::Scheduled(_))
    }
}

/// Keeps notification jobs in step with reminder trigger times.
///
/// # Examples
///
/// ```
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// use std::sync::Arc;
/// use chrono::Duration;
/// use pawtrack::clock::{Clock, ManualClock};
/// use pawtrack::config::SchedulerConfig;
/// use pawtrack::domain::{PetId, RecordId, RecordKind};
/// use pawtrack::jobs::{LocalJobExecutor, LoggingSink, NotificationPayload};
/// use pawtrack::scheduler::ReminderScheduler;
///
/// let clock = Arc::new(ManualClock::default());
/// let executor = Arc::new(LocalJobExecutor::new(Arc::new(LoggingSink)));
/// let scheduler = ReminderScheduler::new(executor, clock.clone(), SchedulerConfig::default());
///
/// let id = RecordId::new(5);
/// let payload = NotificationPayload {
///     title: "Flea treatment".to_string(),
///     body: String::new(),
///     pet_id: PetId::new("P1"),
/// };
/// let outcome = scheduler
///     .schedule(RecordKind::Reminder, id, Some(clock.now() + Duration::hours(1)), payload)
///     .await
///     .unwrap();
/// assert_eq!(outcome.job().unwrap().key, "reminder:5");
///
/// assert_eq!(scheduler.cancel(RecordKind::Reminder, id).await.unwrap(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ReminderScheduler {
    executor: Arc<dyn JobExecutor>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    pub(crate) locks: KeyedLocks,
}

impl ReminderScheduler {
    /// Creates a scheduler over `executor`.
    pub fn new(executor: Arc<dyn JobExecutor>, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            executor,
            clock,
            config,
            locks: KeyedLocks::new(),
        }
    }

    /// The executor jobs are submitted to.
    pub fn executor(&self) -> &Arc<dyn JobExecutor> {
        &self.executor
    }

    /// Ensures exactly one job for a future `trigger`, or none otherwise.
    ///
    /// Calling this again with a different trigger reschedules.
    #[instrument(skip(self, trigger, payload), fields(kind = %kind, id = ?id.map(RecordId::get)))]
    pub async fn schedule(
        &self,
        kind: RecordKind,
        id: Option<RecordId>,
        trigger: Option<DateTime<Utc>>,
        mut payload: NotificationPayload,
    ) -> Result<ScheduleOutcome, JobError> {
        let Some(id) = id else {
            debug!("skipping schedule for record without identity");
            return Ok(ScheduleOutcome::Skipped(SkipReason::NoIdentity));
        };
        let key = job_key(kind, id);
        let tag = job_tag(kind, id);
        let _guard = self.locks.lock(&key).await;

        let now = self.clock.now();
        let trigger = match trigger {
            Some(trigger) if self.is_future(trigger, now) => trigger,
            other => {
                let reason = match other {
                    Some(trigger) => SkipReason::NotInFuture { trigger },
                    None => SkipReason::NoTrigger,
                };
                let removed = self.cancel_unlocked(&key, &tag).await?;
                debug!(%reason, removed, "schedule skipped");
                return Ok(ScheduleOutcome::Skipped(reason));
            },
        };

        if payload.title.trim().is_empty() {
            payload.title = self.config.default_title.clone();
        }
        if !self.executor.supports_atomic_replace() {
            self.cancel_unlocked(&key, &tag).await?;
        }
        let job = self
            .executor
            .submit(JobRequest {
                key,
                tag,
                fire_at: trigger,
                delay: (trigger - now).to_std().unwrap_or_default(),
                payload,
                policy: ExistingJobPolicy::Replace,
            })
            .await?;
        debug!(fire_at = %job.fire_at, run_id = %job.run_id, "job scheduled");
        Ok(ScheduleOutcome::Scheduled(job))
    }

    /// Schedules or cancels according to a payload's [`ReminderPlan`].
    pub async fn apply_plan(
        &self,
        kind: RecordKind,
        id: Option<RecordId>,
        pet_id: &PetId,
        plan: &ReminderPlan,
    ) -> Result<ScheduleOutcome, JobError> {
        if id.is_none() {
            return Ok(ScheduleOutcome::Skipped(SkipReason::NoIdentity));
        }
        if plan.is_completed {
            self.cancel(kind, id).await?;
            return Ok(ScheduleOutcome::Skipped(SkipReason::Completed));
        }
        let payload = NotificationPayload {
            title: plan.title.clone(),
            body: plan.body.clone(),
            pet_id: pet_id.clone(),
        };
        self.schedule(kind, id, plan.trigger_time, payload).await
    }

    /// Removes every job for the record. Returns how many were active.
    #[instrument(skip(self), fields(kind = %kind, id = ?id.map(RecordId::get)))]
    pub async fn cancel(&self, kind: RecordKind, id: Option<RecordId>) -> Result<usize, JobError> {
        let Some(id) = id else {
            return Ok(0);
        };
        let key = job_key(kind, id);
        let tag = job_tag(kind, id);
        let _guard = self.locks.lock(&key).await;
        let removed = self.cancel_unlocked(&key, &tag).await?;
        debug!(removed, "jobs cancelled");
        Ok(removed)
    }

    /// The active job for the record, if any.
    pub async fn active_job(&self, kind: RecordKind, id: RecordId) -> Option<NotificationJob> {
        self.executor.active(&job_key(kind, id)).await
    }

    fn is_future(&self, trigger: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let lead = Duration::milliseconds(i64::try_from(self.config.min_lead_ms).unwrap_or(i64::MAX));
        now.checked_add_signed(lead)
            .is_some_and(|earliest| trigger > earliest)
    }

    async fn cancel_unlocked(&self, key: &str, tag: &str) -> Result<usize, JobError> {
        let by_key = usize::from(self.executor.cancel_by_key(key).await?);
        let by_tag = self.executor.cancel_by_tag(tag).await?;
        Ok(by_key + by_tag)
    }
}
