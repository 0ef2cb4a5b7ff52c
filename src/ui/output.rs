use crate::entity::Quote;
use crate::ui::{Icons, theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// One quote with its source, e.g. `💬 'text' from 'Title' by Author (p. 12)`
pub fn quote_line(quote: &Quote) {
    let source = format!("from '{}' by {}", quote.book.title, quote.book.author.name);
    let page = if quote.page > 0 {
        format!(" (p. {})", quote.page)
    } else {
        String::new()
    };
    println!(
        "{} '{}' {}{}",
        Icons::QUOTE,
        quote.text.style(theme().quote.clone()),
        source.style(theme().source.clone()),
        dim(&page)
    );
}
