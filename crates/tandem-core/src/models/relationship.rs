//! Relationship and membership models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UserId;

/// A unique identifier for a relationship, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipId(Uuid);

impl RelationshipId {
    /// Create a new unique relationship ID using UUID v7
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

impl Default for RelationshipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelationshipId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A two-person relationship, joined via its invite code
///
/// Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier
    pub id: RelationshipId,
    /// Invite code, unique across all relationships
    pub code: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Relationship {
    /// Create a new relationship with the given invite code
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            id: RelationshipId::new(),
            code: code.into(),
            created_at: crate::util::timestamp_ms(),
        }
    }
}

/// A user's membership in a relationship
///
/// At most two memberships exist per relationship, at most one per
/// (user, relationship) pair. Insertion order is significant: the first
/// membership row is "user A" in aggregated history, the second "user B".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// The relationship joined
    pub relationship_id: RelationshipId,
    /// The joining user
    pub user_id: UserId,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Membership {
    /// Create a new membership linking a user to a relationship
    #[must_use]
    pub fn new(relationship_id: RelationshipId, user_id: UserId) -> Self {
        Self {
            relationship_id,
            user_id,
            created_at: crate::util::timestamp_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_id_parse() {
        let id = RelationshipId::new();
        let parsed: RelationshipId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_relationship_new() {
        let relationship = Relationship::new("ABC123");
        assert_eq!(relationship.code, "ABC123");
        assert!(relationship.created_at > 0);
    }

    #[test]
    fn test_membership_new() {
        let relationship_id = RelationshipId::new();
        let user_id = UserId::new();
        let membership = Membership::new(relationship_id, user_id);
        assert_eq!(membership.relationship_id, relationship_id);
        assert_eq!(membership.user_id, user_id);
    }
}
