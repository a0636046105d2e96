//! Explicit parsing of enum values arriving from outside the crate.
//!
//! Remote payloads and older local data can carry enum spellings this crate
//! does not know. Instead of silently mapping them to a default, every
//! domain enum implements [`WireEnum`], whose [`parse_wire`](WireEnum::parse_wire)
//! returns a [`ParseOutcome`] that keeps three cases apart:
//!
//! - [`ParseOutcome::Known`]: a canonical spelling (case-insensitive).
//! - [`ParseOutcome::Defaulted`]: a recognized placeholder such as `""`,
//!   `"unknown"` or `"other"` that maps to the enum's fallback variant.
//! - [`ParseOutcome::Unparseable`]: anything else.
//!
//! Callers decide what to do with the last two via
//! [`require_known`](ParseOutcome::require_known),
//! [`accept_defaults`](ParseOutcome::accept_defaults) or a configured
//! [`UnknownValuePolicy`].

use serde::{Deserialize, Serialize};

/// Placeholder spellings shared by every [`WireEnum`].
const PLACEHOLDERS: &[&str] = &["", "unknown", "other", "none", "n/a", "unspecified"];

/// Result of parsing an externally supplied enum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// The value matched a canonical spelling.
    Known(T),
    /// The value is a recognized placeholder; `value` is the fallback variant.
    Defaulted {
        /// The fallback variant.
        value: T,
        /// The raw input.
        raw: String,
    },
    /// The value matched nothing.
    Unparseable {
        /// The raw input.
        raw: String,
    },
}

/// Error produced when a [`ParseOutcome`] is resolved strictly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input matched no spelling at all.
    #[error("unrecognized {kind} value: {raw:?}")]
    Unrecognized {
        /// Name of the enum being parsed.
        kind: &'static str,
        /// The raw input.
        raw: String,
    },

    /// The input was a placeholder and the caller required a concrete value.
    #[error("{kind} value {raw:?} is a placeholder, not a concrete value")]
    Placeholder {
        /// Name of the enum being parsed.
        kind: &'static str,
        /// The raw input.
        raw: String,
    },
}

/// How to treat values that are not [`ParseOutcome::Known`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownValuePolicy {
    /// Placeholders and unparseable values are errors.
    Reject,
    /// Placeholders and unparseable values become the fallback variant.
    #[default]
    Fallback,
}

impl<T> ParseOutcome<T> {
    /// Returns the parsed value only for canonical spellings.
    pub fn require_known(self, kind: &'static str) -> Result<T, ParseError> {
        match self {
            Self::Known(value) => Ok(value),
            Self::Defaulted { raw, .. } => Err(ParseError::Placeholder { kind, raw }),
            Self::Unparseable { raw } => Err(ParseError::Unrecognized { kind, raw }),
        }
    }

    /// Accepts canonical spellings and placeholders; rejects everything else.
    pub fn accept_defaults(self, kind: &'static str) -> Result<T, ParseError> {
        match self {
            Self::Known(value) | Self::Defaulted { value, .. } => Ok(value),
            Self::Unparseable { raw } => Err(ParseError::Unrecognized { kind, raw }),
        }
    }

    /// Returns `true` for [`ParseOutcome::Known`].
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// A domain enum with a stable external spelling.
///
/// Implementors list their canonical spellings in [`VARIANTS`](Self::VARIANTS)
/// and name the variant placeholders map to in [`FALLBACK`](Self::FALLBACK).
pub trait WireEnum: Sized + Copy + PartialEq + 'static {
    /// Human-readable name used in error messages.
    const NAME: &'static str;

    /// Variant used for placeholders and under [`UnknownValuePolicy::Fallback`].
    const FALLBACK: Self;

    /// Canonical spellings, matched case-insensitively.
    const VARIANTS: &'static [(&'static str, Self)];

    /// Parses `raw` into a three-way [`ParseOutcome`].
    fn parse_wire(raw: &str) -> ParseOutcome<Self> {
        let trimmed = raw.trim();
        if let Some((_, variant)) = Self::VARIANTS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        {
            return ParseOutcome::Known(*variant);
        }
        if PLACEHOLDERS
            .iter()
            .any(|placeholder| placeholder.eq_ignore_ascii_case(trimmed))
        {
            return ParseOutcome::Defaulted {
                value: Self::FALLBACK,
                raw: raw.to_string(),
            };
        }
        ParseOutcome::Unparseable {
            raw: raw.to_string(),
        }
    }

    /// Parses `raw` and resolves the outcome with `policy`.
    fn parse_with(raw: &str, policy: UnknownValuePolicy) -> Result<Self, ParseError> {
        match policy {
            UnknownValuePolicy::Reject => Self::parse_wire(raw).require_known(Self::NAME),
            UnknownValuePolicy::Fallback => Ok(match Self::parse_wire(raw) {
                ParseOutcome::Known(value) | ParseOutcome::Defaulted { value, .. } => value,
                ParseOutcome::Unparseable { .. } => Self::FALLBACK,
            }),
        }
    }

    /// Canonical spelling of this variant.
    fn as_wire(&self) -> &'static str {
        Self::VARIANTS
            .iter()
            .find(|(_, variant)| *variant == *self)
            .map_or("", |(name, _)| *name)
    }
}
