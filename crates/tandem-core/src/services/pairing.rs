//! Relationship pairing via invite codes

use libsql::Connection;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::db::{LibSqlRelationshipRepository, RelationshipRepository};
use crate::error::{Error, Result};
use crate::models::{Membership, Relationship, RelationshipId, UserId};

/// Invite code length in characters
pub const CODE_LENGTH: usize = 6;

/// Characters used in invite codes
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// How many freshly generated codes to try before giving up on finding an
/// unused one
const CODE_ATTEMPTS: usize = 5;

/// Maximum members per relationship
const MAX_MEMBERS: usize = 2;

/// Result of creating a relationship: the new id plus the code to share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedRelationship {
    /// Identifier of the new relationship
    pub relationship_id: RelationshipId,
    /// Invite code the partner joins with
    pub code: String,
}

/// Creates relationships and links members to them
pub struct PairingService<'a> {
    conn: &'a Connection,
}

impl<'a> PairingService<'a> {
    /// Create a new service with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a relationship and link the caller as its first member
    pub async fn create_relationship(&self, user_id: &UserId) -> Result<PairedRelationship> {
        let repo = LibSqlRelationshipRepository::new(self.conn);

        let code = unused_code(&repo).await?;
        let relationship = Relationship::new(code);
        repo.create(&relationship).await?;
        repo.add_member(&Membership::new(relationship.id, *user_id))
            .await?;

        tracing::info!(relationship = %relationship.id, "Created relationship");
        Ok(PairedRelationship {
            relationship_id: relationship.id,
            code: relationship.code,
        })
    }

    /// Join an existing relationship by invite code
    ///
    /// Fails with `NotFound` for an unknown code, `AlreadyMember` when the
    /// caller already holds a membership, and `RelationshipFull` when two
    /// memberships already exist.
    pub async fn join_relationship(&self, user_id: &UserId, code: &str) -> Result<RelationshipId> {
        let repo = LibSqlRelationshipRepository::new(self.conn);

        let relationship = repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| Error::NotFound(format!("invite code {code}")))?;

        let members = repo.members(&relationship.id).await?;
        if members.iter().any(|m| m.user_id == *user_id) {
            return Err(Error::AlreadyMember);
        }
        if members.len() >= MAX_MEMBERS {
            return Err(Error::RelationshipFull);
        }

        repo.add_member(&Membership::new(relationship.id, *user_id))
            .await?;

        tracing::info!(relationship = %relationship.id, "User joined relationship");
        Ok(relationship.id)
    }

}

/// Generate a code not currently held by any relationship
///
/// Checks [`CODE_ATTEMPTS`] candidates; if every one collides (vanishingly
/// unlikely at this scale) a final fresh code goes to the store unchecked
/// and its unique code constraint has the final say, surfacing a race as
/// `CodeTaken`.
async fn unused_code<R: RelationshipRepository>(repo: &R) -> Result<String> {
    let mut code = generate_code();
    for _ in 0..CODE_ATTEMPTS {
        if repo.find_by_code(&code).await?.is_none() {
            return Ok(code);
        }
        tracing::warn!("Invite code collision, regenerating");
        code = generate_code();
    }
    Ok(code)
}

/// Generate a short uppercase alphanumeric invite code
#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_CHARSET.len());
            CODE_CHARSET[idx] as char
        })
        .collect()
}
