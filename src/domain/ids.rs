//! Canonical identifiers.
//!
//! Records are identified by a store-assigned [`RecordId`] (a non-zero
//! integer) and belong to exactly one pet, identified by an opaque
//! [`PetId`] string. A zero-valued record id cannot be constructed, so
//! "absent identity" is always spelled `Option::<RecordId>::None`.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Store-assigned record identity. Stable for the lifetime of a record.
///
/// # Examples
///
/// ```
/// use pawtrack::domain::RecordId;
///
/// assert!(RecordId::new(0).is_none());
/// let id = RecordId::new(42).unwrap();
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(NonZeroU64);

impl RecordId {
    /// Returns `None` for zero, which is never a valid identity.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw integer value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl From<NonZeroU64> for RecordId {
    fn from(value: NonZeroU64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<NonZeroU64>().map(Self)
    }
}

/// Opaque identifier of the pet a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetId(String);

impl PetId {
    /// Wraps a pet identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The four record domains served by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Health records (vaccinations, vet visits, medication).
    Health,
    /// Time-triggered reminders.
    Reminder,
    /// Status updates with media and comments.
    Status,
    /// Care instructions and documents.
    Care,
}

impl RecordKind {
    /// Stable lowercase name used in storage keys, cache scopes and job keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Reminder => "reminder",
            Self::Status => "status",
            Self::Care => "care",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "health" => Some(Self::Health),
            "reminder" => Some(Self::Reminder),
            "status" => Some(Self::Status),
            "care" => Some(Self::Care),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_identity() {
        assert!(RecordId::new(0).is_none());
        assert!("0".parse::<RecordId>().is_err());
        assert_eq!("17".parse::<RecordId>().unwrap().get(), 17);
    }

    #[test]
    fn record_id_serializes_as_plain_integer() {
        let id = RecordId::new(9).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "9");
        assert!(serde_json::from_str::<RecordId>("0").is_err());
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            RecordKind::Health,
            RecordKind::Reminder,
            RecordKind::Status,
            RecordKind::Care,
        ] {
            assert_eq!(RecordKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(RecordKind::from_name("pet"), None);
    }
}
