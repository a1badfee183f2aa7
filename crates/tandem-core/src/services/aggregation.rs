//! 7-day vibe history aggregation and trend insight

use chrono::{Days, NaiveDate};
use libsql::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{
    LibSqlRelationshipRepository, LibSqlUserRepository, LibSqlVibeRepository,
    RelationshipRepository, UserRepository, VibeRepository,
};
use crate::error::Result;
use crate::models::{RelationshipId, UserId, Vibe};
use crate::util::today_local;

/// Number of calendar days in an aggregated history window
pub const HISTORY_DAYS: usize = 7;

/// Number of most recent days the trend insight looks at
pub const INSIGHT_WINDOW_DAYS: usize = 3;

/// One user's mood entry in a history row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    /// Mood score, 1-5
    pub mood: i64,
    /// Optional note
    pub note: Option<String>,
}

/// One calendar day in the two-user timeline
///
/// A `None` slot means that user has no submission for the date
/// (rendered as "no vibe yet").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    /// Calendar date
    pub date: NaiveDate,
    /// First member's entry, by membership insertion order
    pub user_a: Option<MoodEntry>,
    /// Second member's entry, by membership insertion order
    pub user_b: Option<MoodEntry>,
}

/// Display identity of one relationship member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User identifier
    pub id: UserId,
    /// Display name
    pub name: String,
}

/// A reconstructed 7-day, two-user mood timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibeHistory {
    /// Exactly [`HISTORY_DAYS`] entries, newest first
    pub days: Vec<DayEntry>,
    /// The relationship's members in membership insertion order
    pub users: Vec<UserSummary>,
}

/// Best-effort textual read on the recent shared mood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    /// Both recent averages at 4 or above
    Positive,
    /// Both recent averages at 2 or below
    Concern,
    /// Recent averages at least 2 apart
    Diverging,
    /// Anything else, including not enough data
    Balanced,
}

impl Insight {
    /// Human-readable message for display
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Positive => "You have both been feeling great lately. Keep it up!",
            Self::Concern => {
                "You have both been feeling low lately. It might help to check in with each other."
            }
            Self::Diverging => "Your moods have drifted apart over the last few days.",
            Self::Balanced => "Your moods look steady and balanced.",
        }
    }
}

/// Reconstructs mood timelines from stored vibes
pub struct VibeAggregationService<'a> {
    conn: &'a Connection,
}

impl<'a> VibeAggregationService<'a> {
    /// Create a new service with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Aggregate the 7-day timeline ending today (local calendar)
    pub async fn history(&self, relationship_id: &RelationshipId) -> Result<VibeHistory> {
        self.history_on(today_local(), relationship_id).await
    }

    /// Aggregate the 7-day timeline ending on a specific day
    ///
    /// Public for testability; production callers go through [`Self::history`].
    pub async fn history_on(
        &self,
        today: NaiveDate,
        relationship_id: &RelationshipId,
    ) -> Result<VibeHistory> {
        let memberships = LibSqlRelationshipRepository::new(self.conn)
            .members(relationship_id)
            .await?;

        // Positional assignment: first membership row is user A on every
        // timeline row, second is user B. Not name-based, not configurable.
        let user_a = memberships.first().map(|m| m.user_id);
        let user_b = memberships.get(1).map(|m| m.user_id);

        let oldest = today
            .checked_sub_days(Days::new(HISTORY_DAYS as u64 - 1))
            .unwrap_or(today);
        let vibes = LibSqlVibeRepository::new(self.conn)
            .list_between(relationship_id, oldest, today)
            .await?;

        let days = (0..HISTORY_DAYS)
            .map(|offset| {
                let date = today
                    .checked_sub_days(Days::new(offset as u64))
                    .unwrap_or(today);
                DayEntry {
                    date,
                    user_a: entry_for(&vibes, date, user_a),
                    user_b: entry_for(&vibes, date, user_b),
                }
            })
            .collect();

        let users = LibSqlUserRepository::new(self.conn);
        let mut summaries = Vec::new();
        for membership in &memberships {
            // Skip dangling membership rows rather than failing the whole
            // timeline.
            if let Some(user) = users.get(&membership.user_id).await? {
                summaries.push(UserSummary {
                    id: user.id,
                    name: user.name,
                });
            }
        }

        Ok(VibeHistory {
            days,
            users: summaries,
        })
    }
}

fn entry_for(vibes: &[Vibe], date: NaiveDate, user_id: Option<UserId>) -> Option<MoodEntry> {
    let user_id = user_id?;
    vibes
        .iter()
        .find(|v| v.date == date && v.user_id == user_id)
        .map(|v| MoodEntry {
            mood: v.mood,
            note: v.note.clone(),
        })
}

/// Derive the trend insight from an aggregated timeline
///
/// Deterministic and stateless: averages each user's moods over the
/// [`INSIGHT_WINDOW_DAYS`] most recent days (entries expected newest first,
/// as produced by the aggregation service). Days without a submission don't
/// count toward the average; a user with no recent submissions at all makes
/// the insight fall through to `Balanced`.
#[must_use]
pub fn insight(days: &[DayEntry]) -> Insight {
    let window = &days[..days.len().min(INSIGHT_WINDOW_DAYS)];

    let average_a = average(window.iter().filter_map(|d| d.user_a.as_ref()));
    let average_b = average(window.iter().filter_map(|d| d.user_b.as_ref()));

    let (Some(a), Some(b)) = (average_a, average_b) else {
        return Insight::Balanced;
    };

    if a >= 4.0 && b >= 4.0 {
        Insight::Positive
    } else if a <= 2.0 && b <= 2.0 {
        Insight::Concern
    } else if (a - b).abs() >= 2.0 {
        Insight::Diverging
    } else {
        Insight::Balanced
    }
}

#[allow(clippy::cast_precision_loss)] // moods are 1-5
fn average<'a>(entries: impl Iterator<Item = &'a MoodEntry>) -> Option<f64> {
    let mut sum = 0i64;
    let mut count = 0i64;
    for entry in entries {
        sum += entry.mood;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::Database;
    use crate::models::Membership;
    use crate::services::VibeSubmissionService;

    async fn setup_pair() -> (Database, RelationshipId, UserId, UserId) {
        let db = Database::open_in_memory().await.unwrap();
        let users = LibSqlUserRepository::new(db.connection());
        let first = users.create("First", "first@example.com").await.unwrap();
        let second = users.create("Second", "second@example.com").await.unwrap();

        let relationships = LibSqlRelationshipRepository::new(db.connection());
        let relationship = crate::models::Relationship::new("AGG001");
        relationships.create(&relationship).await.unwrap();
        relationships
            .add_member(&Membership::new(relationship.id, first.id))
            .await
            .unwrap();
        relationships
            .add_member(&Membership::new(relationship.id, second.id))
            .await
            .unwrap();

        (db, relationship.id, first.id, second.id)
    }

    fn day(text: &str) -> NaiveDate {
        text.parse().unwrap()
    }

    fn entry(mood: i64) -> Option<MoodEntry> {
        Some(MoodEntry { mood, note: None })
    }

    fn window(moods: [(Option<MoodEntry>, Option<MoodEntry>); 3]) -> Vec<DayEntry> {
        let today = day("2024-05-07");
        moods
            .into_iter()
            .enumerate()
            .map(|(offset, (user_a, user_b))| DayEntry {
                date: today - Days::new(offset as u64),
                user_a,
                user_b,
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_history_has_exactly_seven_days_newest_first() {
        let (db, relationship_id, _, _) = setup_pair().await;
        let service = VibeAggregationService::new(db.connection());

        let history = service
            .history_on(day("2024-05-07"), &relationship_id)
            .await
            .unwrap();

        assert_eq!(history.days.len(), HISTORY_DAYS);
        assert_eq!(history.days[0].date, day("2024-05-07"));
        assert_eq!(history.days[6].date, day("2024-05-01"));
        for pair in history.days.windows(2) {
            assert!(pair[0].date > pair[1].date);
        }
        // No submissions yet: every slot is empty
        assert!(history
            .days
            .iter()
            .all(|d| d.user_a.is_none() && d.user_b.is_none()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_history_assigns_users_positionally() {
        let (db, relationship_id, first, second) = setup_pair().await;
        let submissions = VibeSubmissionService::new(db.connection());

        submissions
            .submit_on(day("2024-05-07"), &relationship_id, &first, 5, None)
            .await
            .unwrap();
        submissions
            .submit_on(
                day("2024-05-06"),
                &relationship_id,
                &second,
                2,
                Some("meh".to_string()),
            )
            .await
            .unwrap();

        let history = VibeAggregationService::new(db.connection())
            .history_on(day("2024-05-07"), &relationship_id)
            .await
            .unwrap();

        // First membership row is user A, second is user B
        assert_eq!(history.users[0].name, "First");
        assert_eq!(history.users[1].name, "Second");

        assert_eq!(history.days[0].user_a, entry(5));
        assert_eq!(history.days[0].user_b, None);
        assert_eq!(history.days[1].user_a, None);
        assert_eq!(
            history.days[1].user_b,
            Some(MoodEntry {
                mood: 2,
                note: Some("meh".to_string())
            })
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_history_ignores_vibes_older_than_window() {
        let (db, relationship_id, first, _) = setup_pair().await;
        let submissions = VibeSubmissionService::new(db.connection());

        submissions
            .submit_on(day("2024-04-30"), &relationship_id, &first, 1, None)
            .await
            .unwrap();

        let history = VibeAggregationService::new(db.connection())
            .history_on(day("2024-05-07"), &relationship_id)
            .await
            .unwrap();

        assert_eq!(history.days.len(), HISTORY_DAYS);
        assert!(history.days.iter().all(|d| d.user_a.is_none()));
    }

    #[test]
    fn test_insight_positive_when_both_high() {
        let days = window([
            (entry(5), entry(4)),
            (entry(4), entry(5)),
            (entry(4), entry(4)),
        ]);
        assert_eq!(insight(&days), Insight::Positive);
    }

    #[test]
    fn test_insight_concern_when_both_low() {
        let days = window([
            (entry(1), entry(2)),
            (entry(2), entry(1)),
            (entry(2), entry(2)),
        ]);
        assert_eq!(insight(&days), Insight::Concern);
    }

    #[test]
    fn test_insight_diverging_when_far_apart() {
        let days = window([
            (entry(5), entry(2)),
            (entry(5), entry(3)),
            (entry(5), entry(3)),
        ]);
        assert_eq!(insight(&days), Insight::Diverging);
    }

    #[test]
    fn test_insight_balanced_otherwise() {
        let days = window([
            (entry(3), entry(3)),
            (entry(4), entry(3)),
            (entry(3), entry(4)),
        ]);
        assert_eq!(insight(&days), Insight::Balanced);
    }

    #[test]
    fn test_insight_balanced_without_data() {
        let days = window([(entry(5), None), (entry(5), None), (entry(5), None)]);
        assert_eq!(insight(&days), Insight::Balanced);
        assert_eq!(insight(&[]), Insight::Balanced);
    }

    #[test]
    fn test_insight_only_looks_at_recent_window() {
        // Older low days beyond the 3-day window must not drag the result down
        let mut days = window([
            (entry(5), entry(5)),
            (entry(5), entry(5)),
            (entry(4), entry(4)),
        ]);
        days.push(DayEntry {
            date: day("2024-05-04"),
            user_a: entry(1),
            user_b: entry(1),
        });
        assert_eq!(insight(&days), Insight::Positive);
    }
}
