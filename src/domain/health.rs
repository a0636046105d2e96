//! Health records: vaccinations, vet visits, medication courses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::RecordKind;
use crate::domain::parse::WireEnum;
use crate::domain::record::Payload;

/// What kind of health event a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthRecordKind {
    /// A vaccine dose.
    Vaccination,
    /// A consultation at the vet.
    VetVisit,
    /// A medication course.
    Medication,
    /// A surgical procedure.
    Surgery,
    /// A routine check-up.
    Checkup,
    /// Anything else.
    Other,
}

impl WireEnum for HealthRecordKind {
    const NAME: &'static str = "health record kind";
    const FALLBACK: Self = Self::Other;
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("VACCINATION", Self::Vaccination),
        ("VET_VISIT", Self::VetVisit),
        ("MEDICATION", Self::Medication),
        ("SURGERY", Self::Surgery),
        ("CHECKUP", Self::Checkup),
        ("OTHER", Self::Other),
    ];
}

/// Payload of a health record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntry {
    /// Event kind.
    pub kind: HealthRecordKind,
    /// Short title, e.g. "Rabies booster".
    pub title: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// When the event happened.
    pub recorded_on: DateTime<Utc>,
    /// Attending veterinarian.
    #[serde(default)]
    pub veterinarian: Option<String>,
    /// When a follow-up (booster, re-check) is due.
    #[serde(default)]
    pub next_due: Option<DateTime<Utc>>,
}

impl Payload for HealthEntry {
    const KIND: RecordKind = RecordKind::Health;
}
