//! Status updates posted by adopters, with attached media and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ids::RecordKind;
use crate::domain::parse::WireEnum;
use crate::domain::record::Payload;

/// How the pet is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mood {
    /// Doing great.
    Happy,
    /// Settled in.
    Calm,
    /// Energetic.
    Playful,
    /// Nervous or stressed.
    Anxious,
    /// Not feeling well.
    Unwell,
    /// Not stated.
    Unknown,
}

impl WireEnum for Mood {
    const NAME: &'static str = "mood";
    const FALLBACK: Self = Self::Unknown;
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("HAPPY", Self::Happy),
        ("CALM", Self::Calm),
        ("PLAYFUL", Self::Playful),
        ("ANXIOUS", Self::Anxious),
        ("UNWELL", Self::Unwell),
        ("UNKNOWN", Self::Unknown),
    ];
}

/// A photo or video attached to a status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Client-generated identifier.
    pub id: Uuid,
    /// Where the media lives.
    pub url: String,
    /// Optional caption.
    #[serde(default)]
    pub caption: Option<String>,
}

impl MediaItem {
    /// Creates a media item with a fresh identifier.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            caption: None,
        }
    }
}

/// A comment on a status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Client-generated identifier.
    pub id: Uuid,
    /// Who wrote it.
    pub author: String,
    /// Comment text.
    pub body: String,
    /// When it was written.
    pub posted_at: DateTime<Utc>,
}

impl Comment {
    /// Creates a comment with a fresh identifier, posted now.
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: author.into(),
            body: body.into(),
            posted_at: Utc::now(),
        }
    }
}

/// Payload of a status update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// How the pet is doing.
    pub mood: Mood,
    /// Free-form text.
    pub message: String,
    /// Attached media, in upload order.
    #[serde(default)]
    pub media: Vec<MediaItem>,
    /// Comments, in posting order.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl StatusUpdate {
    /// Creates an update without media or comments.
    pub fn new(mood: Mood, message: impl Into<String>) -> Self {
        Self {
            mood,
            message: message.into(),
            media: Vec::new(),
            comments: Vec::new(),
        }
    }
}

impl Payload for StatusUpdate {
    const KIND: RecordKind = RecordKind::Status;
}
