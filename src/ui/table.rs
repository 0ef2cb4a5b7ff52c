use tabled::{Table, Tabled, settings::Style};

use crate::entity::Book;
use crate::storage::DbStats;

#[derive(Tabled)]
pub struct StatsRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

/// Row counts per table, parents first
pub struct StatsTable {
    rows: Vec<StatsRow>,
}

impl StatsTable {
    pub fn new(stats: &DbStats) -> Self {
        let rows = stats
            .rows()
            .into_iter()
            .map(|(kind, rows)| StatsRow {
                table: kind.table().to_string(),
                rows,
            })
            .collect();
        Self { rows }
    }

    pub fn total(&self) -> usize {
        self.rows.iter().map(|row| row.rows).sum()
    }

    pub fn build(&self) -> String {
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

#[derive(Tabled)]
struct BookRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "ISBN")]
    isbn: String,
    #[tabled(rename = "Released")]
    released: String,
}

pub fn books_table(books: &[Book]) -> String {
    if books.is_empty() {
        return String::new();
    }
    let rows: Vec<BookRow> = books
        .iter()
        .map(|book| BookRow {
            id: book.id,
            title: book.title.clone(),
            author: book.author.name.clone(),
            isbn: book.isbn.clone().unwrap_or_default(),
            released: book.release_date.to_string(),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;

    #[test]
    fn test_stats_table() {
        let store = fixture_store();
        let table = StatsTable::new(&store.stats().unwrap());

        assert_eq!(table.total(), 10);
        let rendered = table.build();
        assert!(rendered.contains("Quotes"));
        assert!(rendered.contains("Languages"));
    }

    #[test]
    fn test_books_table() {
        let store = fixture_store();

        let books = books_table(&store.get_books().unwrap());
        assert!(books.contains("Book2"));
        assert!(books.contains("Author1"));
        assert!(books_table(&[]).is_empty());
    }
}
