//! Entity types - the five kinds of rows in the quote store
//!
//! - `Topic`, `Author`, `Language`: leaf entities with a single label
//! - `Book`: owns one Author, Topic and Language
//! - `Quote`: owns one Book
//!
//! Identity `0` means the entity has never been persisted. Entities read from
//! a [`Store`] or created by one of its `new_*` factories carry a binding to
//! that store, so they can be committed again with [`Topic::commit`] and
//! friends.

use crate::storage::Store;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The five entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Topic,
    Author,
    Language,
    Book,
    Quote,
}

impl EntityKind {
    /// Get the string representation of the entity kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Topic => "topic",
            EntityKind::Author => "author",
            EntityKind::Language => "language",
            EntityKind::Book => "book",
            EntityKind::Quote => "quote",
        }
    }

    /// Name of the backing table
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Topic => "Topics",
            EntityKind::Author => "Authors",
            EntityKind::Language => "Languages",
            EntityKind::Book => "Books",
            EntityKind::Quote => "Quotes",
        }
    }

    /// All kinds, parents before children
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Topic,
            EntityKind::Author,
            EntityKind::Language,
            EntityKind::Book,
            EntityKind::Quote,
        ]
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "topic" | "topics" => Ok(EntityKind::Topic),
            "author" | "authors" => Ok(EntityKind::Author),
            "language" | "languages" | "lang" => Ok(EntityKind::Language),
            "book" | "books" => Ok(EntityKind::Book),
            "quote" | "quotes" => Ok(EntityKind::Quote),
            _ => Err(Error::Validation(format!("entity kind: {s}"))),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Common surface of every entity.
pub trait Entity {
    const KIND: EntityKind;

    /// Store-assigned identity, `0` when not yet persisted
    fn id(&self) -> i64;

    fn is_persisted(&self) -> bool {
        self.id() != 0
    }
}

/// Handle to the store an entity belongs to.
///
/// Two bindings always compare equal: entity equality is value equality.
#[derive(Clone, Default)]
pub struct Binding(Option<Store>);

impl Binding {
    pub(crate) fn to(store: &Store) -> Self {
        Self(Some(store.clone()))
    }

    pub fn store(&self) -> Option<&Store> {
        self.0.as_ref()
    }
}

impl PartialEq for Binding {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Binding {}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(store) => write!(f, "Binding({})", store.location()),
            None => write!(f, "Binding(unbound)"),
        }
    }
}

fn require_text(kind: EntityKind, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{kind}: {field} must not be empty")));
    }
    Ok(())
}

fn bound_store(binding: &Binding, kind: EntityKind) -> Result<Store> {
    binding.store().cloned().ok_or(Error::Unbound(kind))
}

/// Methods shared by the three single-label entities.
macro_rules! leaf_entity {
    ($ty:ident, $field:ident, $kind:expr) => {
        impl $ty {
            /// Create an unpersisted, unbound entity
            pub fn new($field: impl Into<String>) -> Self {
                Self {
                    id: 0,
                    $field: $field.into(),
                    binding: Binding::default(),
                }
            }

            /// The store this entity is bound to, if any
            pub fn store(&self) -> Option<&Store> {
                self.binding.store()
            }

            /// Insert or update this entity through its bound store.
            ///
            /// Returns the identity of the row, which is also written back
            /// into `self.id`.
            pub fn commit(&mut self) -> Result<i64> {
                let store = bound_store(&self.binding, $kind)?;
                store.commit(self)
            }

            pub fn validate(&self) -> Result<()> {
                require_text($kind, stringify!($field), &self.$field)
            }

            pub(crate) fn bind(&mut self, store: &Store) {
                self.binding = Binding::to(store);
            }
        }

        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> i64 {
                self.id
            }
        }
    };
}

/// A subject area, e.g. "Philosophy".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Topic {
    pub id: i64,
    #[serde(rename = "Topic")]
    pub label: String,
    #[serde(skip)]
    pub(crate) binding: Binding,
}

/// The author of one or more books.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Author {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub(crate) binding: Binding,
}

/// The language a book is written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Language {
    pub id: i64,
    #[serde(rename = "Language")]
    pub label: String,
    #[serde(skip)]
    pub(crate) binding: Binding,
}

leaf_entity!(Topic, label, EntityKind::Topic);
leaf_entity!(Author, name, EntityKind::Author);
leaf_entity!(Language, label, EntityKind::Language);

/// A book, together with its author, topic and language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Book {
    pub id: i64,
    pub author: Author,
    pub topic: Topic,
    pub language: Language,
    pub title: String,
    /// Unique when present
    #[serde(rename = "ISBN")]
    pub isbn: Option<String>,
    pub release_date: NaiveDate,
    #[serde(skip)]
    pub(crate) binding: Binding,
}

impl Book {
    /// Create an unpersisted, unbound book released today.
    pub fn new(author: Author, topic: Topic, language: Language, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            author,
            topic,
            language,
            title: title.into(),
            isbn: None,
            release_date: Utc::now().date_naive(),
            binding: Binding::default(),
        }
    }

    /// Set the ISBN; blank input clears it.
    pub fn set_isbn(&mut self, isbn: impl Into<String>) {
        let isbn = isbn.into();
        let trimmed = isbn.trim();
        self.isbn = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    pub fn store(&self) -> Option<&Store> {
        self.binding.store()
    }

    /// Insert or update this book through its bound store.
    ///
    /// A new book first commits its author, topic and language so their
    /// identities can be used as foreign keys.
    pub fn commit(&mut self) -> Result<i64> {
        let store = bound_store(&self.binding, EntityKind::Book)?;
        store.commit(self)
    }

    pub fn validate(&self) -> Result<()> {
        require_text(EntityKind::Book, "title", &self.title)?;
        if let Some(isbn) = &self.isbn {
            require_text(EntityKind::Book, "isbn", isbn)?;
        }
        Ok(())
    }

    pub(crate) fn bind(&mut self, store: &Store) {
        self.author.bind(store);
        self.topic.bind(store);
        self.language.bind(store);
        self.binding = Binding::to(store);
    }
}

impl Entity for Book {
    const KIND: EntityKind = EntityKind::Book;

    fn id(&self) -> i64 {
        self.id
    }
}

/// A quote taken from a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Quote {
    pub id: i64,
    pub book: Book,
    #[serde(rename = "Quote")]
    pub text: String,
    pub page: u32,
    pub record_date: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) binding: Binding,
}

impl Quote {
    /// Create an unpersisted, unbound quote on page 0, recorded now.
    pub fn new(book: Book, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            book,
            text: text.into(),
            page: 0,
            record_date: Utc::now(),
            binding: Binding::default(),
        }
    }

    pub fn store(&self) -> Option<&Store> {
        self.binding.store()
    }

    /// Insert or update this quote through its bound store.
    ///
    /// A new quote first commits its book (and, recursively, the book's
    /// author, topic and language).
    pub fn commit(&mut self) -> Result<i64> {
        let store = bound_store(&self.binding, EntityKind::Quote)?;
        store.commit(self)
    }

    pub fn validate(&self) -> Result<()> {
        require_text(EntityKind::Quote, "text", &self.text)
    }

    pub(crate) fn bind(&mut self, store: &Store) {
        self.book.bind(store);
        self.binding = Binding::to(store);
    }
}

impl Entity for Quote {
    const KIND: EntityKind = EntityKind::Quote;

    fn id(&self) -> i64 {
        self.id
    }
}
