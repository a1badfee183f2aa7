//! Document store layer for Tandem
//!
//! Four record kinds (users, relationships, memberships, vibes) behind
//! narrow repository traits; libSQL is the only implementation.

mod connection;
mod migrations;
mod relationship_repository;
mod user_repository;
mod vibe_repository;

pub use connection::Database;
pub use relationship_repository::{LibSqlRelationshipRepository, RelationshipRepository};
pub use user_repository::{LibSqlUserRepository, UserRepository};
pub use vibe_repository::{LibSqlVibeRepository, VibeRepository};

/// Whether a libSQL error is a violation of the named unique constraint.
///
/// Uniqueness for vibes and memberships is enforced by composite unique
/// indexes at the store level; the read-then-insert check in the services is
/// only a friendly first line. Constraint hits on insert must map to the
/// same conflict errors the check produces.
pub(crate) fn is_unique_violation(error: &libsql::Error, column_hint: &str) -> bool {
    let message = error.to_string();
    message.contains("UNIQUE constraint failed") && message.contains(column_hint)
}
