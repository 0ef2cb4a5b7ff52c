//! Query Façade - read paths over the store
//!
//! Every accessor returns owned, fully hydrated entities bound to the store
//! they came from. Books always carry their author, topic and language;
//! quotes always carry their book. Results are ordered by identity.
//!
//! A missing identity is `Ok(None)`; a related query on a missing parent is
//! an empty list.

mod hydrate;

use rusqlite::{OptionalExtension, Params, Row};

use crate::commit::Commit;
use crate::entity::{Author, Book, Language, Quote, Topic};
use crate::storage::{Store, schema};
use crate::Result;

type Hydrate<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

/// Escape `LIKE` metacharacters so `text` matches literally; pairs with
/// `ESCAPE '\'` in the search statements.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

impl Store {
    /// Run a cached select and bind every resulting entity to this store.
    fn query_all<T: Commit, P: Params>(&self, sql: &str, params: P, hydrate: Hydrate<T>) -> Result<Vec<T>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query_map(params, hydrate)?;

            let mut entities = Vec::new();
            for row in rows {
                let mut entity = row?;
                entity.bind(self);
                entities.push(entity);
            }
            Ok(entities)
        })
    }

    fn query_one<T: Commit, P: Params>(&self, sql: &str, params: P, hydrate: Hydrate<T>) -> Result<Option<T>> {
        let entity = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            Ok(stmt.query_row(params, hydrate).optional()?)
        })?;

        Ok(entity.map(|mut entity| {
            entity.bind(self);
            entity
        }))
    }

    // ========== Topics ==========

    pub fn get_topics(&self) -> Result<Vec<Topic>> {
        self.query_all(schema::SELECT_TOPICS, [], hydrate::topic)
    }

    pub fn get_topic(&self, id: i64) -> Result<Option<Topic>> {
        self.query_one(schema::SELECT_TOPIC, [id], hydrate::topic)
    }

    /// Topics whose label contains `text`
    pub fn search_topics(&self, text: &str) -> Result<Vec<Topic>> {
        self.query_all(schema::SEARCH_TOPICS, [like_pattern(text)], hydrate::topic)
    }

    // ========== Authors ==========

    pub fn get_authors(&self) -> Result<Vec<Author>> {
        self.query_all(schema::SELECT_AUTHORS, [], hydrate::author)
    }

    pub fn get_author(&self, id: i64) -> Result<Option<Author>> {
        self.query_one(schema::SELECT_AUTHOR, [id], hydrate::author)
    }

    /// Authors whose name contains `text`
    pub fn search_authors(&self, text: &str) -> Result<Vec<Author>> {
        self.query_all(schema::SEARCH_AUTHORS, [like_pattern(text)], hydrate::author)
    }

    // ========== Languages ==========

    pub fn get_languages(&self) -> Result<Vec<Language>> {
        self.query_all(schema::SELECT_LANGUAGES, [], hydrate::language)
    }

    pub fn get_language(&self, id: i64) -> Result<Option<Language>> {
        self.query_one(schema::SELECT_LANGUAGE, [id], hydrate::language)
    }

    pub fn search_languages(&self, text: &str) -> Result<Vec<Language>> {
        self.query_all(schema::SEARCH_LANGUAGES, [like_pattern(text)], hydrate::language)
    }

    // ========== Books ==========

    pub fn get_books(&self) -> Result<Vec<Book>> {
        self.query_all(schema::SELECT_BOOKS, [], hydrate::book)
    }

    pub fn get_book(&self, id: i64) -> Result<Option<Book>> {
        self.query_one(schema::SELECT_BOOK, [id], hydrate::book)
    }

    /// Books whose title or ISBN contains `text`
    pub fn search_books(&self, text: &str) -> Result<Vec<Book>> {
        self.query_all(schema::SEARCH_BOOKS, [like_pattern(text)], hydrate::book)
    }

    pub fn related_books_of_topic(&self, topic_id: i64) -> Result<Vec<Book>> {
        self.query_all(schema::BOOKS_OF_TOPIC, [topic_id], hydrate::book)
    }

    pub fn related_books_of_author(&self, author_id: i64) -> Result<Vec<Book>> {
        self.query_all(schema::BOOKS_OF_AUTHOR, [author_id], hydrate::book)
    }

    pub fn related_books_of_language(&self, language_id: i64) -> Result<Vec<Book>> {
        self.query_all(schema::BOOKS_OF_LANGUAGE, [language_id], hydrate::book)
    }

    // ========== Quotes ==========

    pub fn get_quotes(&self) -> Result<Vec<Quote>> {
        self.query_all(schema::SELECT_QUOTES, [], hydrate::quote)
    }

    pub fn get_quote(&self, id: i64) -> Result<Option<Quote>> {
        self.query_one(schema::SELECT_QUOTE, [id], hydrate::quote)
    }

    /// Quotes whose text contains `text`
    pub fn search_quotes(&self, text: &str) -> Result<Vec<Quote>> {
        self.query_all(schema::SEARCH_QUOTES, [like_pattern(text)], hydrate::quote)
    }

    /// Quotes from books on the given topic
    pub fn related_quotes_of_topic(&self, topic_id: i64) -> Result<Vec<Quote>> {
        self.query_all(schema::QUOTES_OF_TOPIC, [topic_id], hydrate::quote)
    }

    /// Quotes from books by the given author
    pub fn related_quotes_of_author(&self, author_id: i64) -> Result<Vec<Quote>> {
        self.query_all(schema::QUOTES_OF_AUTHOR, [author_id], hydrate::quote)
    }

    /// Quotes from books written in the given language
    pub fn related_quotes_of_language(&self, language_id: i64) -> Result<Vec<Quote>> {
        self.query_all(schema::QUOTES_OF_LANGUAGE, [language_id], hydrate::quote)
    }

    pub fn related_quotes_of_book(&self, book_id: i64) -> Result<Vec<Quote>> {
        self.query_all(schema::QUOTES_OF_BOOK, [book_id], hydrate::quote)
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::Entity;
    use crate::testing::fixture_store;

    #[test]
    fn test_get_topics_in_order() {
        let store = fixture_store();

        let topics = store.get_topics().unwrap();
        let labels: Vec<_> = topics.iter().map(|t| (t.id, t.label.as_str())).collect();
        assert_eq!(labels, vec![(1, "Topic1"), (2, "Topic2")]);
    }

    #[test]
    fn test_get_by_id_and_missing_id() {
        let store = fixture_store();

        assert_eq!(store.get_topic(1).unwrap().unwrap().label, "Topic1");
        assert_eq!(store.get_topic(69).unwrap(), None);
        assert_eq!(store.get_author(69).unwrap(), None);
        assert_eq!(store.get_language(0).unwrap(), None);
        assert_eq!(store.get_book(69).unwrap(), None);
        assert_eq!(store.get_quote(69).unwrap(), None);
    }

    #[test]
    fn test_book_hydrates_children() {
        let store = fixture_store();

        let book = store.get_book(2).unwrap().unwrap();
        assert_eq!(book.title, "Book2");
        assert_eq!(book.author.name, "Author2");
        assert_eq!(book.topic.label, "Topic2");
        assert_eq!(book.language.label, "Language2");
        assert!(book.isbn.is_some());
    }

    #[test]
    fn test_quote_hydrates_full_graph_and_binds_it() {
        let store = fixture_store();

        let quote = store.get_quote(1).unwrap().unwrap();
        assert_eq!(quote.text, "Quote1");
        assert_eq!(quote.book.title, "Book1");
        assert_eq!(quote.book.author.name, "Author1");
        assert_eq!(quote.page, 10);

        for bound in [
            quote.store(),
            quote.book.store(),
            quote.book.author.store(),
            quote.book.topic.store(),
            quote.book.language.store(),
        ] {
            assert!(bound.is_some_and(|s| s.same_store(&store)));
        }
    }

    #[test]
    fn test_hydrated_entity_can_commit_itself() {
        let store = fixture_store();

        let mut language = store.get_language(2).unwrap().unwrap();
        language.label = "Esperanto".to_string();
        assert_eq!(language.commit().unwrap(), 2);
        assert_eq!(store.get_language(2).unwrap().unwrap().label, "Esperanto");
    }

    #[test]
    fn test_search_books_matches_title() {
        let store = fixture_store();

        let books = store.search_books("Book").unwrap();
        let ids: Vec<_> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(store.search_books("Book2").unwrap().len(), 1);
        assert!(store.search_books("Nothing").unwrap().is_empty());
    }

    #[test]
    fn test_search_books_matches_isbn() {
        let store = fixture_store();

        let isbn = store.get_book(2).unwrap().unwrap().isbn.unwrap();
        let books = store.search_books(&isbn).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, 2);
    }

    #[test]
    fn test_search_is_substring_and_case_insensitive() {
        let store = fixture_store();

        assert_eq!(store.search_topics("opic").unwrap().len(), 2);
        assert_eq!(store.search_authors("author1").unwrap().len(), 1);
        assert_eq!(store.search_languages("2").unwrap()[0].label, "Language2");
        assert_eq!(store.search_quotes("QUOTE").unwrap().len(), 2);
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let store = fixture_store();

        assert!(store.search_books("_").unwrap().is_empty());
        assert!(store.search_topics("%").unwrap().is_empty());
        assert!(store.search_quotes("Quote_").unwrap().is_empty());

        store.new_topic("100% Stoic").commit().unwrap();
        store.new_topic("snake_case").commit().unwrap();
        store.new_topic(r"back\slash").commit().unwrap();

        let labels = |text| -> Vec<String> {
            store.search_topics(text).unwrap().into_iter().map(|t| t.label).collect()
        };
        assert_eq!(labels("%"), vec!["100% Stoic"]);
        assert_eq!(labels("_"), vec!["snake_case"]);
        assert_eq!(labels(r"\"), vec![r"back\slash"]);
        assert_eq!(labels(r"k\s"), vec![r"back\slash"]);
    }

    #[test]
    fn test_related_books() {
        let store = fixture_store();

        let books = store.related_books_of_topic(1).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Book1");

        assert_eq!(store.related_books_of_author(2).unwrap()[0].title, "Book2");
        assert_eq!(store.related_books_of_language(2).unwrap().len(), 1);
        assert!(store.related_books_of_topic(69).unwrap().is_empty());
    }

    #[test]
    fn test_related_quotes() {
        let store = fixture_store();

        assert_eq!(store.related_quotes_of_book(1).unwrap()[0].text, "Quote1");
        assert_eq!(store.related_quotes_of_topic(2).unwrap()[0].text, "Quote2");
        assert_eq!(store.related_quotes_of_author(1).unwrap().len(), 1);
        assert_eq!(store.related_quotes_of_language(2).unwrap().len(), 1);

        assert!(store.related_quotes_of_book(69).unwrap().is_empty());
        assert!(store.related_quotes_of_author(69).unwrap().is_empty());
        assert!(store.related_quotes_of_language(69).unwrap().is_empty());
        assert!(store.related_quotes_of_topic(69).unwrap().is_empty());
    }

    #[test]
    fn test_read_back_is_persisted() {
        let store = fixture_store();

        assert!(store.get_quotes().unwrap().iter().all(|q| q.is_persisted()));
    }
}
