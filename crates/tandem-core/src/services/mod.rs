//! Application services for Tandem
//!
//! Thin coordination layer over the store repositories: account
//! registration/login, invite-code pairing, daily vibe submission, and
//! 7-day history aggregation.

mod accounts;
mod aggregation;
mod pairing;
mod submission;

pub use accounts::{AccountService, Session};
pub use aggregation::{
    insight, DayEntry, Insight, MoodEntry, UserSummary, VibeAggregationService, VibeHistory,
    HISTORY_DAYS, INSIGHT_WINDOW_DAYS,
};
pub use pairing::{PairedRelationship, PairingService, CODE_LENGTH};
pub use submission::{SubmitVibes, VibeSubmissionService};
