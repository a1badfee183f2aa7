//! Daily vibe submission

use chrono::NaiveDate;
use libsql::Connection;

use crate::db::{LibSqlVibeRepository, VibeRepository};
use crate::error::{Error, Result};
use crate::models::{validate_mood, validate_note, RelationshipId, UserId, Vibe, VibeId};
use crate::util::{normalize_text_option, today_local};

/// Anything vibes can be submitted through
///
/// The seam between the offline queue and the real submission service; the
/// queue replays captured entries against whatever implements this.
#[allow(async_fn_in_trait)]
pub trait SubmitVibes {
    /// Submit one mood entry for the current calendar day
    async fn submit(
        &self,
        relationship_id: &RelationshipId,
        user_id: &UserId,
        mood: i64,
        note: Option<String>,
    ) -> Result<VibeId>;
}

/// Validates and stores one mood entry per user per relationship per day
pub struct VibeSubmissionService<'a> {
    conn: &'a Connection,
}

impl<'a> VibeSubmissionService<'a> {
    /// Create a new service with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Submit a vibe dated to a specific calendar day
    ///
    /// Public for testability; production callers go through
    /// [`SubmitVibes::submit`], which stamps today's local date.
    pub async fn submit_on(
        &self,
        date: NaiveDate,
        relationship_id: &RelationshipId,
        user_id: &UserId,
        mood: i64,
        note: Option<String>,
    ) -> Result<VibeId> {
        validate_mood(mood)?;
        validate_note(note.as_deref())?;
        let note = normalize_text_option(note);

        let repo = LibSqlVibeRepository::new(self.conn);

        // Friendly read-check; the store's composite unique index on
        // (relationship_id, user_id, date) is the authoritative backstop
        // for near-simultaneous submissions.
        if repo
            .find_for_day(relationship_id, date, user_id)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateSubmission { date });
        }

        let vibe = Vibe::new(*relationship_id, *user_id, mood, note, date);
        repo.insert(&vibe).await?;

        tracing::debug!(vibe = %vibe.id, %date, "Stored vibe");
        Ok(vibe.id)
    }
}

impl SubmitVibes for VibeSubmissionService<'_> {
    async fn submit(
        &self,
        relationship_id: &RelationshipId,
        user_id: &UserId,
        mood: i64,
        note: Option<String>,
    ) -> Result<VibeId> {
        // The day boundary is local midnight, not UTC.
        self.submit_on(today_local(), relationship_id, user_id, mood, note)
            .await
    }
}
