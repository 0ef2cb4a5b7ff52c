//! Database schema definitions and the statement catalog
//!
//! Every statement the store executes is listed in [`ALL_STATEMENTS`] and
//! prepared once at open time.

/// SQL to create the topics table
pub const CREATE_TOPICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Topics (
    Id INTEGER PRIMARY KEY AUTOINCREMENT,
    Topic TEXT NOT NULL UNIQUE CHECK (length(Topic) > 0)
)
"#;

/// SQL to create the authors table
pub const CREATE_AUTHORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Authors (
    Id INTEGER PRIMARY KEY AUTOINCREMENT,
    Name TEXT NOT NULL UNIQUE CHECK (length(Name) > 0)
)
"#;

/// SQL to create the languages table
pub const CREATE_LANGUAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Languages (
    Id INTEGER PRIMARY KEY AUTOINCREMENT,
    Language TEXT NOT NULL UNIQUE CHECK (length(Language) > 0)
)
"#;

/// SQL to create the books table
/// ISBN is nullable; SQLite lets several NULLs coexist under UNIQUE
pub const CREATE_BOOKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Books (
    Id INTEGER PRIMARY KEY AUTOINCREMENT,
    AuthorId INTEGER NOT NULL REFERENCES Authors(Id),
    TopicId INTEGER NOT NULL REFERENCES Topics(Id),
    ISBN TEXT UNIQUE,
    Title TEXT NOT NULL CHECK (length(Title) > 0),
    LanguageId INTEGER NOT NULL REFERENCES Languages(Id),
    ReleaseDate TEXT NOT NULL
)
"#;

/// SQL to create the quotes table
pub const CREATE_QUOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Quotes (
    Id INTEGER PRIMARY KEY AUTOINCREMENT,
    BookId INTEGER NOT NULL REFERENCES Books(Id),
    Quote TEXT NOT NULL CHECK (length(Quote) > 0),
    Page INTEGER NOT NULL DEFAULT 0 CHECK (Page >= 0),
    RecordDate TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_books_author ON Books(AuthorId)",
    "CREATE INDEX IF NOT EXISTS idx_books_topic ON Books(TopicId)",
    "CREATE INDEX IF NOT EXISTS idx_books_language ON Books(LanguageId)",
    "CREATE INDEX IF NOT EXISTS idx_quotes_book ON Quotes(BookId)",
];

/// All schema creation statements, parents first
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_TOPICS_TABLE,
        CREATE_AUTHORS_TABLE,
        CREATE_LANGUAGES_TABLE,
        CREATE_BOOKS_TABLE,
        CREATE_QUOTES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

// Column layout of a book row: Id, Title, ISBN, ReleaseDate, then
// author (Id, Name), topic (Id, Topic), language (Id, Language).
macro_rules! select_books {
    () => {
        "SELECT b.Id, b.Title, b.ISBN, b.ReleaseDate, \
                a.Id, a.Name, t.Id, t.Topic, l.Id, l.Language \
         FROM Books b \
         JOIN Authors a ON a.Id = b.AuthorId \
         JOIN Topics t ON t.Id = b.TopicId \
         JOIN Languages l ON l.Id = b.LanguageId"
    };
}

// Quote columns (Id, Quote, Page, RecordDate) followed by the book layout.
macro_rules! select_quotes {
    () => {
        "SELECT q.Id, q.Quote, q.Page, q.RecordDate, \
                b.Id, b.Title, b.ISBN, b.ReleaseDate, \
                a.Id, a.Name, t.Id, t.Topic, l.Id, l.Language \
         FROM Quotes q \
         JOIN Books b ON b.Id = q.BookId \
         JOIN Authors a ON a.Id = b.AuthorId \
         JOIN Topics t ON t.Id = b.TopicId \
         JOIN Languages l ON l.Id = b.LanguageId"
    };
}

// ========== Topics ==========

pub const SELECT_TOPICS: &str = "SELECT Id, Topic FROM Topics ORDER BY Id";
pub const SELECT_TOPIC: &str = "SELECT Id, Topic FROM Topics WHERE Id = ?1";
pub const SEARCH_TOPICS: &str =
    "SELECT Id, Topic FROM Topics WHERE Topic LIKE '%' || ?1 || '%' ESCAPE '\\' ORDER BY Id";
pub const INSERT_TOPIC: &str = "INSERT INTO Topics (Topic) VALUES (?1) RETURNING Id";
pub const UPDATE_TOPIC: &str = "UPDATE Topics SET Topic = ?1 WHERE Id = ?2";

// ========== Authors ==========

pub const SELECT_AUTHORS: &str = "SELECT Id, Name FROM Authors ORDER BY Id";
pub const SELECT_AUTHOR: &str = "SELECT Id, Name FROM Authors WHERE Id = ?1";
pub const SEARCH_AUTHORS: &str =
    "SELECT Id, Name FROM Authors WHERE Name LIKE '%' || ?1 || '%' ESCAPE '\\' ORDER BY Id";
pub const INSERT_AUTHOR: &str = "INSERT INTO Authors (Name) VALUES (?1) RETURNING Id";
pub const UPDATE_AUTHOR: &str = "UPDATE Authors SET Name = ?1 WHERE Id = ?2";

// ========== Languages ==========

pub const SELECT_LANGUAGES: &str = "SELECT Id, Language FROM Languages ORDER BY Id";
pub const SELECT_LANGUAGE: &str = "SELECT Id, Language FROM Languages WHERE Id = ?1";
pub const SEARCH_LANGUAGES: &str =
    "SELECT Id, Language FROM Languages WHERE Language LIKE '%' || ?1 || '%' ESCAPE '\\' ORDER BY Id";
pub const INSERT_LANGUAGE: &str = "INSERT INTO Languages (Language) VALUES (?1) RETURNING Id";
pub const UPDATE_LANGUAGE: &str = "UPDATE Languages SET Language = ?1 WHERE Id = ?2";

// ========== Books ==========

pub const SELECT_BOOKS: &str = concat!(select_books!(), " ORDER BY b.Id");
pub const SELECT_BOOK: &str = concat!(select_books!(), " WHERE b.Id = ?1");
pub const SEARCH_BOOKS: &str = concat!(
    select_books!(),
    " WHERE b.Title LIKE '%' || ?1 || '%' ESCAPE '\\' OR b.ISBN LIKE '%' || ?1 || '%' ESCAPE '\\' ORDER BY b.Id"
);
pub const BOOKS_OF_TOPIC: &str = concat!(select_books!(), " WHERE b.TopicId = ?1 ORDER BY b.Id");
pub const BOOKS_OF_AUTHOR: &str = concat!(select_books!(), " WHERE b.AuthorId = ?1 ORDER BY b.Id");
pub const BOOKS_OF_LANGUAGE: &str =
    concat!(select_books!(), " WHERE b.LanguageId = ?1 ORDER BY b.Id");
pub const INSERT_BOOK: &str = r#"
INSERT INTO Books (AuthorId, TopicId, ISBN, Title, LanguageId, ReleaseDate)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
RETURNING Id
"#;
pub const UPDATE_BOOK: &str = r#"
UPDATE Books
SET AuthorId = ?1, TopicId = ?2, ISBN = ?3, Title = ?4, LanguageId = ?5, ReleaseDate = ?6
WHERE Id = ?7
"#;

// ========== Quotes ==========

pub const SELECT_QUOTES: &str = concat!(select_quotes!(), " ORDER BY q.Id");
pub const SELECT_QUOTE: &str = concat!(select_quotes!(), " WHERE q.Id = ?1");
pub const SEARCH_QUOTES: &str =
    concat!(select_quotes!(), " WHERE q.Quote LIKE '%' || ?1 || '%' ESCAPE '\\' ORDER BY q.Id");
pub const QUOTES_OF_TOPIC: &str = concat!(select_quotes!(), " WHERE b.TopicId = ?1 ORDER BY q.Id");
pub const QUOTES_OF_AUTHOR: &str =
    concat!(select_quotes!(), " WHERE b.AuthorId = ?1 ORDER BY q.Id");
pub const QUOTES_OF_LANGUAGE: &str =
    concat!(select_quotes!(), " WHERE b.LanguageId = ?1 ORDER BY q.Id");
pub const QUOTES_OF_BOOK: &str = concat!(select_quotes!(), " WHERE q.BookId = ?1 ORDER BY q.Id");
pub const INSERT_QUOTE: &str = r#"
INSERT INTO Quotes (BookId, Quote, Page, RecordDate)
VALUES (?1, ?2, ?3, ?4)
RETURNING Id
"#;
pub const UPDATE_QUOTE: &str = "UPDATE Quotes SET BookId = ?1, Quote = ?2, Page = ?3 WHERE Id = ?4";

// ========== Stats ==========

pub const COUNT_ROWS: &str = r#"
SELECT
    (SELECT COUNT(*) FROM Topics),
    (SELECT COUNT(*) FROM Authors),
    (SELECT COUNT(*) FROM Languages),
    (SELECT COUNT(*) FROM Books),
    (SELECT COUNT(*) FROM Quotes)
"#;

/// Every statement the store runs; all are prepared when the store opens
pub const ALL_STATEMENTS: &[&str] = &[
    SELECT_TOPICS,
    SELECT_TOPIC,
    SEARCH_TOPICS,
    INSERT_TOPIC,
    UPDATE_TOPIC,
    SELECT_AUTHORS,
    SELECT_AUTHOR,
    SEARCH_AUTHORS,
    INSERT_AUTHOR,
    UPDATE_AUTHOR,
    SELECT_LANGUAGES,
    SELECT_LANGUAGE,
    SEARCH_LANGUAGES,
    INSERT_LANGUAGE,
    UPDATE_LANGUAGE,
    SELECT_BOOKS,
    SELECT_BOOK,
    SEARCH_BOOKS,
    BOOKS_OF_TOPIC,
    BOOKS_OF_AUTHOR,
    BOOKS_OF_LANGUAGE,
    INSERT_BOOK,
    UPDATE_BOOK,
    SELECT_QUOTES,
    SELECT_QUOTE,
    SEARCH_QUOTES,
    QUOTES_OF_TOPIC,
    QUOTES_OF_AUTHOR,
    QUOTES_OF_LANGUAGE,
    QUOTES_OF_BOOK,
    INSERT_QUOTE,
    UPDATE_QUOTE,
    COUNT_ROWS,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for stmt in ALL_STATEMENTS {
            assert!(seen.insert(*stmt), "duplicate statement: {stmt}");
        }
    }

    #[test]
    fn test_book_select_joins_all_parents() {
        for table in ["Authors", "Topics", "Languages"] {
            assert!(SELECT_BOOKS.contains(table));
            assert!(SELECT_QUOTES.contains(table));
        }
        assert!(SELECT_QUOTE.ends_with("WHERE q.Id = ?1"));
    }
}
