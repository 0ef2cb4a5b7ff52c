//! SQLite storage implementation

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, params};
use serde::Serialize;

use super::schema;
use crate::commit::{self, Commit, EntityWriter, Record};
use crate::entity::{Author, Book, EntityKind, Language, Quote, Topic};
use crate::{Error, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Headroom over the statement catalog so ad-hoc statements don't evict it
const EXTRA_CACHED_STATEMENTS: usize = 8;

/// SQLite-backed store for quotes and their books, authors, topics and
/// languages.
///
/// Cloning is cheap and every clone shares the same connection. Operations
/// block the calling thread while they hold the connection lock.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    location: String,
    conn: Mutex<Option<Connection>>,
}

impl Store {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Opening store");
        let conn = Connection::open(path)?;
        Self::initialize(conn, path.display().to_string())
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, ":memory:".to_string())
    }

    /// Apply pragmas, create the schema and prepare the statement catalog.
    fn initialize(conn: Connection, location: String) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }

        conn.set_prepared_statement_cache_capacity(
            schema::ALL_STATEMENTS.len() + EXTRA_CACHED_STATEMENTS,
        );
        for sql in schema::ALL_STATEMENTS {
            conn.prepare_cached(sql)?;
        }

        tracing::debug!(
            location = %location,
            statements = schema::ALL_STATEMENTS.len(),
            "Store ready"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                location,
                conn: Mutex::new(Some(conn)),
            }),
        })
    }

    /// Path of the database file, or `:memory:`
    pub fn location(&self) -> &str {
        &self.inner.location
    }

    /// True when both handles share one connection
    pub fn same_store(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Release the connection. Every clone sees the store as closed
    /// afterwards; closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let conn = self.acquire_lock().take();
        match conn {
            Some(conn) => {
                tracing::debug!(location = %self.inner.location, "Closing store");
                conn.close().map_err(|(_, err)| Error::from(err))
            }
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.acquire_lock().is_none()
    }

    /// Lock the connection, recovering from a poisoned mutex.
    fn acquire_lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.inner.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run `f` with the open connection held for its whole duration.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.acquire_lock();
        let conn = guard.as_ref().ok_or(Error::Closed)?;
        f(conn)
    }

    // ========== Factories ==========

    /// A new topic bound to this store
    pub fn new_topic(&self, label: impl Into<String>) -> Topic {
        let mut topic = Topic::new(label);
        topic.bind(self);
        topic
    }

    /// A new author bound to this store
    pub fn new_author(&self, name: impl Into<String>) -> Author {
        let mut author = Author::new(name);
        author.bind(self);
        author
    }

    /// A new language bound to this store
    pub fn new_language(&self, label: impl Into<String>) -> Language {
        let mut language = Language::new(label);
        language.bind(self);
        language
    }

    /// A new book bound to this store; the given children are bound too
    pub fn new_book(
        &self,
        author: Author,
        topic: Topic,
        language: Language,
        title: impl Into<String>,
    ) -> Book {
        let mut book = Book::new(author, topic, language, title);
        book.bind(self);
        book
    }

    /// A new quote bound to this store, recorded now
    pub fn new_quote(&self, book: Book, text: impl Into<String>) -> Quote {
        let mut quote = Quote::new(book, text);
        quote.bind(self);
        quote
    }

    // ========== Commit Operations ==========

    /// Insert or update `entity` and everything its commit plan names.
    ///
    /// On success the whole graph is bound to this store and the root
    /// identity is returned.
    pub fn commit<C: Commit + ?Sized>(&self, entity: &mut C) -> Result<i64> {
        let plan = entity.plan();
        tracing::debug!(
            kind = %C::KIND,
            steps = plan.steps().len(),
            inserts = plan.inserts(),
            "Committing"
        );
        let id = commit::execute(entity, self)?;
        entity.bind(self);
        Ok(id)
    }

    // ========== Statistics ==========

    /// Row counts for every table
    pub fn stats(&self) -> Result<DbStats> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(schema::COUNT_ROWS)?;
            let stats = stmt.query_row([], |row| {
                Ok(DbStats {
                    topics: row.get(0)?,
                    authors: row.get(1)?,
                    languages: row.get(2)?,
                    books: row.get(3)?,
                    quotes: row.get(4)?,
                })
            })?;
            Ok(stats)
        })
    }
}

impl EntityWriter for Store {
    fn insert(&self, record: Record<'_>) -> Result<i64> {
        record.validate()?;
        let kind = record.kind();

        let id = self.with_conn(|conn| {
            let id: i64 = match record {
                Record::Topic(topic) => conn
                    .prepare_cached(schema::INSERT_TOPIC)?
                    .query_row(params![topic.label], |row| row.get(0))?,
                Record::Author(author) => conn
                    .prepare_cached(schema::INSERT_AUTHOR)?
                    .query_row(params![author.name], |row| row.get(0))?,
                Record::Language(language) => conn
                    .prepare_cached(schema::INSERT_LANGUAGE)?
                    .query_row(params![language.label], |row| row.get(0))?,
                Record::Book(book) => conn.prepare_cached(schema::INSERT_BOOK)?.query_row(
                    params![
                        book.author.id,
                        book.topic.id,
                        book.isbn,
                        book.title,
                        book.language.id,
                        book.release_date,
                    ],
                    |row| row.get(0),
                )?,
                Record::Quote(quote) => conn.prepare_cached(schema::INSERT_QUOTE)?.query_row(
                    params![quote.book.id, quote.text, quote.page, quote.record_date],
                    |row| row.get(0),
                )?,
            };
            Ok(id)
        })?;

        tracing::debug!(%kind, id, "Inserted row");
        Ok(id)
    }

    fn update(&self, record: Record<'_>) -> Result<()> {
        record.validate()?;
        let kind = record.kind();
        let id = record.id();

        let changed = self.with_conn(|conn| {
            let changed = match record {
                Record::Topic(topic) => conn
                    .prepare_cached(schema::UPDATE_TOPIC)?
                    .execute(params![topic.label, id])?,
                Record::Author(author) => conn
                    .prepare_cached(schema::UPDATE_AUTHOR)?
                    .execute(params![author.name, id])?,
                Record::Language(language) => conn
                    .prepare_cached(schema::UPDATE_LANGUAGE)?
                    .execute(params![language.label, id])?,
                Record::Book(book) => conn.prepare_cached(schema::UPDATE_BOOK)?.execute(params![
                    book.author.id,
                    book.topic.id,
                    book.isbn,
                    book.title,
                    book.language.id,
                    book.release_date,
                    id,
                ])?,
                Record::Quote(quote) => conn
                    .prepare_cached(schema::UPDATE_QUOTE)?
                    .execute(params![quote.book.id, quote.text, quote.page, id])?,
            };
            Ok(changed)
        })?;

        if changed == 0 {
            return Err(Error::NotFound { kind, id });
        }
        tracing::debug!(%kind, id, "Updated row");
        Ok(())
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        self.same_store(other)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.inner.location)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub topics: usize,
    pub authors: usize,
    pub languages: usize,
    pub books: usize,
    pub quotes: usize,
}

impl DbStats {
    /// Counts paired with their entity kind, parents first
    pub fn rows(&self) -> [(EntityKind, usize); 5] {
        [
            (EntityKind::Topic, self.topics),
            (EntityKind::Author, self.authors),
            (EntityKind::Language, self.languages),
            (EntityKind::Book, self.books),
            (EntityKind::Quote, self.quotes),
        ]
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Topics: {}", self.topics)?;
        writeln!(f, "  Authors: {}", self.authors)?;
        writeln!(f, "  Languages: {}", self.languages)?;
        writeln!(f, "  Books: {}", self.books)?;
        writeln!(f, "  Quotes: {}", self.quotes)
    }
}
