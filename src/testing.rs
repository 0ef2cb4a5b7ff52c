//! Shared test fixtures

use chrono::NaiveDate;

use crate::entity::{Author, Book, Language, Topic};
use crate::storage::Store;

/// In-memory store seeded with two of each entity.
///
/// Book `i` belongs to Author `i`, Topic `i` and Language `i`; Quote `i`
/// comes from Book `i` on page `10 * i`. Everything is inserted through a
/// single cascading commit per quote, so identities are 1 and 2.
pub(crate) fn fixture_store() -> Store {
    let store = Store::open_in_memory().unwrap();
    seed(&store);
    store
}

pub(crate) fn seed(store: &Store) {
    for i in 1..=2u32 {
        let mut book = store.new_book(
            Author::new(format!("Author{i}")),
            Topic::new(format!("Topic{i}")),
            Language::new(format!("Language{i}")),
            format!("Book{i}"),
        );
        book.set_isbn(format!("978-3-16-14841{i}-0"));
        book.release_date = NaiveDate::from_ymd_opt(2000 + i as i32, i, 1).unwrap();

        let mut quote = store.new_quote(book, format!("Quote{i}"));
        quote.page = 10 * i;
        quote.commit().unwrap();
    }
}

/// Fresh book with fresh parents, bound to `store`
pub(crate) fn sample_book(store: &Store, title: &str) -> Book {
    store.new_book(
        store.new_author("Sample Author"),
        store.new_topic("Sample Topic"),
        store.new_language("Sample Language"),
        title,
    )
}
