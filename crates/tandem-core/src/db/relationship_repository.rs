//! Relationship and membership repository implementation

use crate::error::{Error, Result};
use crate::models::{Membership, Relationship, RelationshipId, UserId};
use libsql::{params, Connection};

/// Trait for relationship and membership storage operations (async)
#[allow(async_fn_in_trait)]
pub trait RelationshipRepository {
    /// Create a new relationship record; fails with `CodeTaken` if the
    /// invite code is already held
    async fn create(&self, relationship: &Relationship) -> Result<()>;

    /// Get a relationship by ID
    async fn get(&self, id: &RelationshipId) -> Result<Option<Relationship>>;

    /// Look up a relationship by invite code (the declared index column)
    async fn find_by_code(&self, code: &str) -> Result<Option<Relationship>>;

    /// Link a user to a relationship; fails with `AlreadyMember` if the
    /// (relationship, user) pair already exists
    async fn add_member(&self, membership: &Membership) -> Result<()>;

    /// List a relationship's memberships in stored insertion order
    ///
    /// The first row is "user A" in aggregated history, the second "user B".
    async fn members(&self, relationship_id: &RelationshipId) -> Result<Vec<Membership>>;
}

/// libSQL implementation of `RelationshipRepository`
pub struct LibSqlRelationshipRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlRelationshipRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a relationship from a database row
    fn parse_relationship(row: &libsql::Row) -> Result<Relationship> {
        let id: String = row.get(0)?;
        Ok(Relationship {
            id: id.parse().unwrap_or_default(),
            code: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

impl RelationshipRepository for LibSqlRelationshipRepository<'_> {
    async fn create(&self, relationship: &Relationship) -> Result<()> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO relationships (id, code, created_at) VALUES (?, ?, ?)",
                params![
                    relationship.id.as_str(),
                    relationship.code.clone(),
                    relationship.created_at
                ],
            )
            .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if super::is_unique_violation(&e, "relationships.code") => {
                Err(Error::CodeTaken(relationship.code.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &RelationshipId) -> Result<Option<Relationship>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, code, created_at FROM relationships WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_relationship(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Relationship>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, code, created_at FROM relationships WHERE code = ?",
                params![code],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_relationship(&row)?)),
            None => Ok(None),
        }
    }

    async fn add_member(&self, membership: &Membership) -> Result<()> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO memberships (relationship_id, user_id, created_at) VALUES (?, ?, ?)",
                params![
                    membership.relationship_id.as_str(),
                    membership.user_id.as_str(),
                    membership.created_at
                ],
            )
            .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if super::is_unique_violation(&e, "memberships.") => Err(Error::AlreadyMember),
            Err(e) => Err(e.into()),
        }
    }

    async fn members(&self, relationship_id: &RelationshipId) -> Result<Vec<Membership>> {
        let mut rows = self
            .conn
            .query(
                "SELECT relationship_id, user_id, created_at
                 FROM memberships
                 WHERE relationship_id = ?
                 ORDER BY rowid ASC",
                params![relationship_id.as_str()],
            )
            .await?;

        let mut memberships = Vec::new();
        while let Some(row) = rows.next().await? {
            let relationship_id: String = row.get(0)?;
            let user_id: String = row.get(1)?;
            memberships.push(Membership {
                relationship_id: relationship_id.parse().unwrap_or_default(),
                user_id: user_id.parse().unwrap_or_default(),
                created_at: row.get(2)?,
            });
        }

        Ok(memberships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlUserRepository, UserRepository};
    use crate::models::User;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn make_user(db: &Database, email: &str) -> User {
        LibSqlUserRepository::new(db.connection())
            .create("Test", email)
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_find_by_code() {
        let db = setup().await;
        let repo = LibSqlRelationshipRepository::new(db.connection());

        let relationship = Relationship::new("ABC123");
        repo.create(&relationship).await.unwrap();

        let found = repo.find_by_code("ABC123").await.unwrap().unwrap();
        assert_eq!(found, relationship);

        assert!(repo.find_by_code("ZZZZZZ").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_rejects_duplicate_code_as_conflict() {
        let db = setup().await;
        let repo = LibSqlRelationshipRepository::new(db.connection());

        repo.create(&Relationship::new("SAME00")).await.unwrap();
        let error = repo.create(&Relationship::new("SAME00")).await.unwrap_err();

        // A code collision is a conflict, never a retryable store failure
        assert!(matches!(error, Error::CodeTaken(ref code) if code == "SAME00"));
        assert!(!error.is_transient());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_members_preserve_insertion_order() {
        let db = setup().await;
        let repo = LibSqlRelationshipRepository::new(db.connection());

        let first = make_user(&db, "first@example.com").await;
        let second = make_user(&db, "second@example.com").await;

        let relationship = Relationship::new("ORDER1");
        repo.create(&relationship).await.unwrap();

        repo.add_member(&Membership::new(relationship.id, first.id))
            .await
            .unwrap();
        repo.add_member(&Membership::new(relationship.id, second.id))
            .await
            .unwrap();

        let members = repo.members(&relationship.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].user_id, first.id);
        assert_eq!(members[1].user_id, second.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_member_rejects_duplicate_pair() {
        let db = setup().await;
        let repo = LibSqlRelationshipRepository::new(db.connection());

        let user = make_user(&db, "dup@example.com").await;
        let relationship = Relationship::new("DUP111");
        repo.create(&relationship).await.unwrap();

        repo.add_member(&Membership::new(relationship.id, user.id))
            .await
            .unwrap();
        let error = repo
            .add_member(&Membership::new(relationship.id, user.id))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::AlreadyMember));
    }
}
