//! # Quotebook - quote collection service
//!
//! A relational store of quotes, the books they come from, and the authors,
//! topics and languages of those books.
//!
//! Quotebook provides:
//! - SQLite-backed storage with a small object/relational mapping that
//!   hydrates nested entity graphs (Quote → Book → {Author, Topic, Language})
//! - Insert-or-update commits driven by identity presence, with an explicit
//!   commit plan for nested entities
//! - Read accessors: get-all, get-by-id, substring search and related queries
//! - A JSON REST API and a scheduled mail digest of random quotes

pub mod commit;
pub mod config;
pub mod entity;
pub mod mail;
pub mod query;
pub mod server;
pub mod storage;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use commit::{Action, Commit, CommitPlan, CommitStep, EntityWriter, Record};
pub use entity::{Author, Book, Entity, EntityKind, Language, Quote, Topic};
pub use storage::{DbStats, Store};

/// Result type alias for Quotebook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Quotebook operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid {0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("Store is closed")]
    Closed,

    #[error("{0} is not bound to a store")]
    Unbound(EntityKind),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        let constraint = match &err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Some(message.clone().unwrap_or_else(|| failure.to_string()))
            }
            _ => None,
        };

        match constraint {
            Some(message) => Error::Constraint(message),
            None => Error::Storage(err),
        }
    }
}
