//! tandem-core - Core library for Tandem
//!
//! This crate contains the shared models, document store layer, services,
//! and offline reconciliation queue used by all Tandem clients.

pub mod db;
pub mod error;
pub mod models;
pub mod offline;
pub mod services;
pub mod util;

pub use error::{Error, Result};
pub use models::{Membership, Relationship, RelationshipId, User, UserId, Vibe, VibeId};
