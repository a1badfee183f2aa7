//! Account registration and login
//!
//! Authentication is deliberately a stub: passwords are accepted but never
//! verified, and logout is client-side only (the caller drops its
//! `Session`). There is no process-wide "current user"; a `Session` is an
//! explicit value passed to whatever needs the caller's identity.

use libsql::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{LibSqlUserRepository, UserRepository};
use crate::error::{Error, Result};
use crate::models::{User, UserId};

/// An authenticated caller identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The logged-in user
    pub user_id: UserId,
    /// Display name, for rendering
    pub name: String,
    /// Login email
    pub email: String,
}

/// Registration and login over the user repository
pub struct AccountService<'a> {
    conn: &'a Connection,
}

impl<'a> AccountService<'a> {
    /// Create a new service with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Register a new user; fails with `EmailTaken` for a duplicate email
    pub async fn register(&self, name: &str, email: &str) -> Result<User> {
        let repo = LibSqlUserRepository::new(self.conn);

        // Friendly read-check; the store's unique email constraint is the
        // backstop for the check-then-insert race.
        if repo.find_by_email(email).await?.is_some() {
            return Err(Error::EmailTaken(email.to_string()));
        }

        let user = repo.create(name, email).await?;
        tracing::info!(user = %user.id, "Registered user");
        Ok(user)
    }

    /// Log in by email; the password is accepted but never verified
    pub async fn login(&self, email: &str, _password: &str) -> Result<Session> {
        let repo = LibSqlUserRepository::new(self.conn);

        let user = repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no user with email {email}")))?;

        Ok(Session {
            user_id: user.id,
            name: user.name,
            email: user.email,
        })
    }
}
