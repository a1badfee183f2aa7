//! Data models for Tandem

mod relationship;
mod user;
mod vibe;

pub use relationship::{Membership, Relationship, RelationshipId};
pub use user::{User, UserId};
pub use vibe::{validate_mood, validate_note, Vibe, VibeId, MOOD_MAX, MOOD_MIN, NOTE_MAX_CHARS};
