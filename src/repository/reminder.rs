//! Reminder-only operations.

use tracing::{debug, instrument};

use crate::domain::{Payload, PetId, RecordId, RecordKind, Reminder, ReminderState, TrackableRecord};
use crate::error::Result;
use crate::jobs::NotificationJob;
use crate::repository::ReminderRepository;

impl ReminderRepository {
    /// Marks a reminder complete and cancels its job.
    ///
    /// Completing an already completed reminder changes nothing except
    /// making sure no job is left.
    #[instrument(skip(self), fields(id = id.get()))]
    pub async fn mark_complete(&self, id: RecordId) -> Result<TrackableRecord<Reminder>> {
        let completed = self
            .apply(id, |reminder| {
                if reminder.is_completed {
                    return false;
                }
                reminder.is_completed = true;
                true
            })
            .await?;
        match completed {
            Some(record) => Ok(record),
            None => {
                self.scheduler().cancel(RecordKind::Reminder, Some(id)).await?;
                match self.local(id).await? {
                    Some(record) => Ok(record),
                    None => self.get(id).await,
                }
            },
        }
    }

    /// Records delivery of a fired job.
    ///
    /// `fired_at` is set to the job's fire time only when the job still
    /// matches the reminder: same trigger time, not completed, not already
    /// recorded. Returns the updated record, or `None` when the job was stale
    /// or not a reminder job.
    #[instrument(skip_all, fields(key = %job.key, run_id = %job.run_id))]
    pub async fn record_fired(&self, job: &NotificationJob) -> Result<Option<TrackableRecord<Reminder>>> {
        let Some((RecordKind::Reminder, id)) = job.target() else {
            debug!("not a reminder job");
            return Ok(None);
        };
        let fire_at = job.fire_at;
        let updated = self
            .apply(id, move |reminder| {
                let current = reminder.trigger_time == Some(fire_at)
                    && !reminder.is_completed
                    && !reminder.has_fired();
                if current {
                    reminder.fired_at = Some(fire_at);
                }
                current
            })
            .await?;
        if updated.is_none() {
            debug!("stale job; fire not recorded");
        }
        Ok(updated)
    }

    /// Lifecycle state of a reminder.
    ///
    /// Derived from the local copy and the executor: a reminder with no local
    /// copy reads as [`ReminderState::Removed`].
    pub async fn state(&self, id: RecordId) -> Result<ReminderState> {
        let record = self.local(id).await?;
        let job_active = self
            .scheduler()
            .active_job(RecordKind::Reminder, id)
            .await
            .is_some();
        Ok(ReminderState::of(record.as_ref(), job_active))
    }

    /// Open reminders of `pet_id` whose trigger is still ahead, soonest
    /// first.
    pub async fn upcoming(&self, pet_id: &PetId) -> Result<Vec<TrackableRecord<Reminder>>> {
        let now = self.now();
        let mut upcoming: Vec<_> = self
            .list_for_pet(pet_id)
            .await?
            .into_iter()
            .filter(|record| {
                record
                    .payload
                    .reminder_plan()
                    .is_some_and(|plan| plan.wants_job(now))
            })
            .collect();
        upcoming.sort_by_key(|record| record.payload.trigger_time);
        Ok(upcoming)
    }
}

