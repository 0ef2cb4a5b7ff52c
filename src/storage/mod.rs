//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - Topics(Id, Topic)
//! - Authors(Id, Name)
//! - Languages(Id, Language)
//! - Books(Id, AuthorId, TopicId, ISBN, Title, LanguageId, ReleaseDate)
//! - Quotes(Id, BookId, Quote, Page, RecordDate)

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, Store};
