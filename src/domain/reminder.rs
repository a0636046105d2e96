//! Reminders -- the only records that drive notification jobs.
//!
//! A reminder moves through the following states:
//!
//! ```text
//! Draft --create--> Persisted <--update--> Scheduled --fire--> Fired
//!                      |                      |                  |
//!                      +--- mark_complete ----+------------------+--> Completed
//!                      +--- delete -----------+------------------+--> Removed
//! ```
//!
//! `Scheduled` holds exactly when the job executor has an active job for the
//! reminder's key. `Fired` is recorded explicitly through
//! [`ReminderRepository::record_fired`](crate::repository::ReminderRepository::record_fired).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::RecordKind;
use crate::domain::parse::WireEnum;
use crate::domain::record::{Payload, ReminderPlan, TrackableRecord};

/// What a reminder is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderKind {
    /// Give a medication dose.
    Medication,
    /// A vaccine is due.
    Vaccination,
    /// An appointment at the vet.
    VetAppointment,
    /// Grooming session.
    Grooming,
    /// Feeding time.
    Feeding,
    /// User-defined.
    Custom,
}

impl WireEnum for ReminderKind {
    const NAME: &'static str = "reminder kind";
    const FALLBACK: Self = Self::Custom;
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("MEDICATION", Self::Medication),
        ("VACCINATION", Self::Vaccination),
        ("VET_APPOINTMENT", Self::VetAppointment),
        ("GROOMING", Self::Grooming),
        ("FEEDING", Self::Feeding),
        ("CUSTOM", Self::Custom),
    ];
}

/// Payload of a reminder record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// What the reminder is about.
    pub kind: ReminderKind,
    /// Notification title.
    pub title: String,
    /// Optional notification body.
    #[serde(default)]
    pub notes: Option<String>,
    /// When to notify. `None` means no notification.
    #[serde(default)]
    pub trigger_time: Option<DateTime<Utc>>,
    /// Completed reminders never keep a job.
    #[serde(default)]
    pub is_completed: bool,
    /// The trigger time whose notification has been delivered. A reminder
    /// whose `fired_at` equals its `trigger_time` wants no further job.
    #[serde(default)]
    pub fired_at: Option<DateTime<Utc>>,
}

impl Reminder {
    /// Creates an open reminder.
    pub fn new(kind: ReminderKind, title: impl Into<String>, trigger_time: Option<DateTime<Utc>>) -> Self {
        Self {
            kind,
            title: title.into(),
            notes: None,
            trigger_time,
            is_completed: false,
            fired_at: None,
        }
    }
}

impl Reminder {
    /// Returns `true` when the current trigger time has already fired.
    pub fn has_fired(&self) -> bool {
        self.fired_at.is_some() && self.fired_at == self.trigger_time
    }
}

impl Payload for Reminder {
    const KIND: RecordKind = RecordKind::Reminder;

    fn reminder_plan(&self) -> Option<ReminderPlan> {
        Some(ReminderPlan {
            trigger_time: self.trigger_time.filter(|_| !self.has_fired()),
            is_completed: self.is_completed,
            title: self.title.trim().to_string(),
            body: self.notes.clone().unwrap_or_default(),
        })
    }
}

/// Lifecycle position of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    /// Not yet persisted; no identity.
    Draft,
    /// Persisted without an active job.
    Persisted,
    /// Persisted with exactly one active job.
    Scheduled,
    /// The job fired and delivery was recorded.
    Fired,
    /// Marked complete. Terminal.
    Completed,
    /// Deleted. Terminal.
    Removed,
}

impl ReminderState {
    /// Derives the state from the stored record and whether a job is active.
    ///
    /// `record` is `None` once the reminder has been deleted.
    pub fn of(record: Option<&TrackableRecord<Reminder>>, job_active: bool) -> Self {
        let Some(record) = record else {
            return Self::Removed;
        };
        if record.id.is_none() {
            Self::Draft
        } else if record.payload.is_completed {
            Self::Completed
        } else if job_active {
            Self::Scheduled
        } else if record.payload.has_fired() {
            Self::Fired
        } else {
            Self::Persisted
        }
    }

    /// Returns `true` for `Completed` and `Removed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Removed)
    }
}

impl fmt::Display for ReminderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Persisted => "persisted",
            Self::Scheduled => "scheduled",
            Self::Fired => "fired",
            Self::Completed => "completed",
            Self::Removed => "removed",
        };
        f.write_str(name)
    }
}
