//! User repository implementation

use crate::error::{Error, Result};
use crate::models::{User, UserId};
use libsql::{params, Connection};

/// Trait for user storage operations (async)
#[allow(async_fn_in_trait)]
pub trait UserRepository {
    /// Create a new user; fails with `EmailTaken` for a duplicate email
    async fn create(&self, name: &str, email: &str) -> Result<User>;

    /// Get a user by ID
    async fn get(&self, id: &UserId) -> Result<Option<User>>;

    /// Look up a user by email (the declared index column)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// libSQL implementation of `UserRepository`
pub struct LibSqlUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a user from a database row
    fn parse_user(row: &libsql::Row) -> Result<User> {
        let id: String = row.get(0)?;
        Ok(User {
            id: id.parse().unwrap_or_default(),
            name: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl UserRepository for LibSqlUserRepository<'_> {
    async fn create(&self, name: &str, email: &str) -> Result<User> {
        let user = User::new(name, email);

        let inserted = self
            .conn
            .execute(
                "INSERT INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)",
                params![user.id.as_str(), user.name.clone(), user.email.clone(), user.created_at],
            )
            .await;

        match inserted {
            Ok(_) => Ok(user),
            Err(e) if super::is_unique_violation(&e, "users.email") => {
                Err(Error::EmailTaken(email.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, email, created_at FROM users WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, email, created_at FROM users WHERE email = ? COLLATE NOCASE",
                params![email],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_user(&row)?)),
            None => Ok(None),
        }
    }
}
