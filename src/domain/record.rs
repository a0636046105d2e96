//! Trackable record -- the shape shared by every domain entity.
//!
//! [`TrackableRecord`] wraps a domain payload with the fields every record
//! carries: an identity assigned by the record store on first persist, the
//! owning pet, and a creation timestamp. The `version` field mirrors the
//! store's monotonic version and is never serialized.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::ids::{PetId, RecordId, RecordKind};

/// Scheduling intent derived from a payload.
///
/// Only payloads with a trigger time produce a plan. The repository turns a
/// plan into either a `schedule` or a `cancel` call on the
/// [`ReminderScheduler`](crate::scheduler::ReminderScheduler).
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderPlan {
    /// When the notification should fire, if at all.
    pub trigger_time: Option<DateTime<Utc>>,
    /// Completed records never keep a job.
    pub is_completed: bool,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
}

impl ReminderPlan {
    /// Returns `true` when this plan wants a job at `now`.
    pub fn wants_job(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.trigger_time.is_some_and(|t| t > now)
    }
}

/// Domain payload carried by a [`TrackableRecord`].
pub trait Payload:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// The domain this payload belongs to.
    const KIND: RecordKind;

    /// Scheduling intent, for payloads that carry a trigger time.
    fn reminder_plan(&self) -> Option<ReminderPlan> {
        None
    }
}

/// A persisted (or about to be persisted) domain entity.
///
/// # Examples
///
/// ```
/// use pawtrack::domain::{CareCategory, CareInstruction, PetId, TrackableRecord};
///
/// let draft = TrackableRecord::new(
///     PetId::new("P1"),
///     CareInstruction {
///         category: CareCategory::Feeding,
///         title: "Dinner".to_string(),
///         content: "Half a cup, twice a day".to_string(),
///     },
/// );
/// assert!(draft.id.is_none());
/// assert_eq!(draft.version, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "P: Payload")]
pub struct TrackableRecord<P> {
    /// Absent until the record store assigns one.
    pub id: Option<RecordId>,

    /// The pet this record belongs to.
    pub pet_id: PetId,

    /// Domain fields.
    pub payload: P,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// Store version of the last read or write; `0` when unknown.
    #[serde(skip)]
    pub version: u64,
}

impl<P: Payload> TrackableRecord<P> {
    /// Creates an unpersisted draft stamped with the current time.
    pub fn new(pet_id: PetId, payload: P) -> Self {
        Self::new_at(pet_id, payload, Utc::now())
    }

    /// Creates an unpersisted draft with an explicit creation time.
    pub fn new_at(pet_id: PetId, payload: P, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            pet_id,
            payload,
            created_at,
            version: 0,
        }
    }

    /// The domain of this record.
    pub fn kind(&self) -> RecordKind {
        P::KIND
    }

    /// Returns `true` once the store has assigned an identity.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

// Equality ignores `version`: a cached copy and a live copy of the same
// record compare equal even though only one of them came from the store.
impl<P: PartialEq> PartialEq for TrackableRecord<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.pet_id == other.pet_id
            && self.payload == other.payload
            && self.created_at == other.created_at
    }
}
