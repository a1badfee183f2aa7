//! Error types for tandem-core

use thiserror::Error;

/// Result type alias using tandem-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tandem-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Mood outside the accepted 1-5 range
    #[error("Mood must be between 1 and 5, got {0}")]
    InvalidMood(i64),

    /// Vibe note longer than 140 characters
    #[error("Note must be 140 characters or less, got {0}")]
    NoteTooLong(usize),

    /// Record not found (unknown invite code, user, relationship)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller already holds a membership on this relationship
    #[error("User is already in this relationship")]
    AlreadyMember,

    /// The relationship already has two members
    #[error("This relationship already has two members")]
    RelationshipFull,

    /// A vibe for this user/relationship/day already exists
    #[error("A vibe has already been submitted for {date}")]
    DuplicateSubmission {
        /// Calendar date of the existing submission
        date: chrono::NaiveDate,
    },

    /// A user with this email is already registered
    #[error("A user already exists with email {0}")]
    EmailTaken(String),

    /// A relationship already holds this invite code
    #[error("Invite code {0} is already in use")]
    CodeTaken(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this failure is a transient store/IO problem.
    ///
    /// Transient failures are the only class eligible for retry; the offline
    /// queue keeps an entry captured when replay hits one. Validation,
    /// not-found, and conflict errors are surfaced and never retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::LibSql(_) | Self::Io(_))
    }
}
