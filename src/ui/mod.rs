pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, info, quote_line, section, success, summary_row, warn};
pub use table::{StatsTable, books_table};
pub use theme::{Theme, theme};
