//! Vibe repository implementation

use chrono::NaiveDate;
use libsql::{params, Connection, Value};

use crate::error::{Error, Result};
use crate::models::{RelationshipId, UserId, Vibe};

/// Trait for vibe storage operations (async)
#[allow(async_fn_in_trait)]
pub trait VibeRepository {
    /// Insert a vibe; fails with `DuplicateSubmission` when one already
    /// exists for the same (relationship, user, date)
    async fn insert(&self, vibe: &Vibe) -> Result<()>;

    /// Find a user's vibe for one relationship day, if submitted
    async fn find_for_day(
        &self,
        relationship_id: &RelationshipId,
        date: NaiveDate,
        user_id: &UserId,
    ) -> Result<Option<Vibe>>;

    /// List a relationship's vibes within an inclusive date range,
    /// oldest date first
    async fn list_between(
        &self,
        relationship_id: &RelationshipId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Vibe>>;
}

/// libSQL implementation of `VibeRepository`
pub struct LibSqlVibeRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlVibeRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a vibe from a database row
    fn parse_vibe(row: &libsql::Row) -> Result<Vibe> {
        let id: String = row.get(0)?;
        let relationship_id: String = row.get(1)?;
        let user_id: String = row.get(2)?;
        let note = match row.get_value(4)? {
            Value::Text(text) => Some(text),
            _ => None,
        };
        let date: String = row.get(5)?;

        Ok(Vibe {
            id: id.parse().unwrap_or_default(),
            relationship_id: relationship_id.parse().unwrap_or_default(),
            user_id: user_id.parse().unwrap_or_default(),
            mood: row.get(3)?,
            note,
            date: date.parse().unwrap_or_default(),
            created_at: row.get(6)?,
        })
    }
}

impl VibeRepository for LibSqlVibeRepository<'_> {
    async fn insert(&self, vibe: &Vibe) -> Result<()> {
        let note_value = vibe
            .note
            .clone()
            .map_or(Value::Null, Value::Text);

        let inserted = self
            .conn
            .execute(
                "INSERT INTO vibes (id, relationship_id, user_id, mood, note, date, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    vibe.id.as_str(),
                    vibe.relationship_id.as_str(),
                    vibe.user_id.as_str(),
                    vibe.mood,
                    note_value,
                    vibe.date.to_string(),
                    vibe.created_at
                ],
            )
            .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if super::is_unique_violation(&e, "vibes.") => {
                Err(Error::DuplicateSubmission { date: vibe.date })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_for_day(
        &self,
        relationship_id: &RelationshipId,
        date: NaiveDate,
        user_id: &UserId,
    ) -> Result<Option<Vibe>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, relationship_id, user_id, mood, note, date, created_at
                 FROM vibes
                 WHERE relationship_id = ? AND date = ? AND user_id = ?",
                params![relationship_id.as_str(), date.to_string(), user_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_vibe(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_between(
        &self,
        relationship_id: &RelationshipId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Vibe>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, relationship_id, user_id, mood, note, date, created_at
                 FROM vibes
                 WHERE relationship_id = ? AND date >= ? AND date <= ?
                 ORDER BY date ASC",
                params![relationship_id.as_str(), from.to_string(), to.to_string()],
            )
            .await?;

        let mut vibes = Vec::new();
        while let Some(row) = rows.next().await? {
            vibes.push(Self::parse_vibe(&row)?);
        }

        Ok(vibes)
    }
}
