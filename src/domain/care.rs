//! Care instructions handed over at adoption.

use serde::{Deserialize, Serialize};

use crate::domain::ids::RecordKind;
use crate::domain::parse::WireEnum;
use crate::domain::record::Payload;

/// Topic of a care instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CareCategory {
    /// Diet and feeding schedule.
    Feeding,
    /// Coat, nails, bathing.
    Grooming,
    /// Walks and play.
    Exercise,
    /// Ongoing medical needs.
    Medical,
    /// Behaviour and training.
    Training,
    /// Everything else.
    General,
}

impl WireEnum for CareCategory {
    const NAME: &'static str = "care category";
    const FALLBACK: Self = Self::General;
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("FEEDING", Self::Feeding),
        ("GROOMING", Self::Grooming),
        ("EXERCISE", Self::Exercise),
        ("MEDICAL", Self::Medical),
        ("TRAINING", Self::Training),
        ("GENERAL", Self::General),
    ];
}

/// Payload of a care instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareInstruction {
    /// Topic.
    pub category: CareCategory,
    /// Short title.
    pub title: String,
    /// Instruction text.
    pub content: String,
}

impl Payload for CareInstruction {
    const KIND: RecordKind = RecordKind::Care;
}
