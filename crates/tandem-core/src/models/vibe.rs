//! Vibe model and submission validation rules

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::{RelationshipId, UserId};

/// Lowest accepted mood score
pub const MOOD_MIN: i64 = 1;
/// Highest accepted mood score
pub const MOOD_MAX: i64 = 5;
/// Maximum vibe note length in characters
pub const NOTE_MAX_CHARS: usize = 140;

/// A unique identifier for a vibe, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VibeId(Uuid);

impl VibeId {
    /// Create a new unique vibe ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for VibeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VibeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VibeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One user's mood entry for one calendar day in a relationship
///
/// Exactly one vibe exists per (relationship, user, date); once submitted,
/// a day's vibe is never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vibe {
    /// Unique identifier
    pub id: VibeId,
    /// The relationship this vibe belongs to
    pub relationship_id: RelationshipId,
    /// The submitting user
    pub user_id: UserId,
    /// Mood score, 1 (low) to 5 (high)
    pub mood: i64,
    /// Optional short note, at most 140 characters
    pub note: Option<String>,
    /// Calendar date of the submission (client-local day boundary)
    pub date: NaiveDate,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Vibe {
    /// Create a new vibe for the given day
    #[must_use]
    pub fn new(
        relationship_id: RelationshipId,
        user_id: UserId,
        mood: i64,
        note: Option<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: VibeId::new(),
            relationship_id,
            user_id,
            mood,
            note,
            date,
            created_at: crate::util::timestamp_ms(),
        }
    }
}

/// Check that a mood score is within the accepted 1-5 range
pub const fn validate_mood(mood: i64) -> Result<()> {
    if mood < MOOD_MIN || mood > MOOD_MAX {
        return Err(Error::InvalidMood(mood));
    }
    Ok(())
}

/// Check that a note, when present, fits in 140 characters
pub fn validate_note(note: Option<&str>) -> Result<()> {
    if let Some(note) = note {
        let chars = note.chars().count();
        if chars > NOTE_MAX_CHARS {
            return Err(Error::NoteTooLong(chars));
        }
    }
    Ok(())
}
