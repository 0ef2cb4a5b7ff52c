//! Row hydration - joined rows into nested entity graphs
//!
//! Column offsets follow the select layouts in `storage::schema`.

use rusqlite::Row;

use crate::entity::{Author, Binding, Book, Language, Quote, Topic};

pub(crate) fn topic(row: &Row<'_>) -> rusqlite::Result<Topic> {
    topic_at(row, 0)
}

pub(crate) fn author(row: &Row<'_>) -> rusqlite::Result<Author> {
    author_at(row, 0)
}

pub(crate) fn language(row: &Row<'_>) -> rusqlite::Result<Language> {
    language_at(row, 0)
}

pub(crate) fn book(row: &Row<'_>) -> rusqlite::Result<Book> {
    book_at(row, 0)
}

pub(crate) fn quote(row: &Row<'_>) -> rusqlite::Result<Quote> {
    Ok(Quote {
        id: row.get(0)?,
        text: row.get(1)?,
        page: row.get(2)?,
        record_date: row.get(3)?,
        book: book_at(row, 4)?,
        binding: Binding::default(),
    })
}

fn topic_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(at)?,
        label: row.get(at + 1)?,
        binding: Binding::default(),
    })
}

fn author_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(at)?,
        name: row.get(at + 1)?,
        binding: Binding::default(),
    })
}

fn language_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Language> {
    Ok(Language {
        id: row.get(at)?,
        label: row.get(at + 1)?,
        binding: Binding::default(),
    })
}

fn book_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(at)?,
        title: row.get(at + 1)?,
        isbn: row.get(at + 2)?,
        release_date: row.get(at + 3)?,
        author: author_at(row, at + 4)?,
        topic: topic_at(row, at + 6)?,
        language: language_at(row, at + 8)?,
        binding: Binding::default(),
    })
}
