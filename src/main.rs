//! Quotebook CLI - quote collection service

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quotebook::config::{self, QuotebookConfig};
use quotebook::mail::DigestJob;
use quotebook::ui::{self, Icons, StatsTable};
use quotebook::{EntityKind, Store};

#[derive(Parser)]
#[command(name = "quotebook")]
#[command(version)]
#[command(about = "Quote collection service - REST API and daily quote digest")]
#[command(long_about = r#"
Quotebook keeps quotes together with the books they come from and the
authors, topics and languages of those books, and serves them as JSON.

Example usage:
  quotebook init
  quotebook serve
  quotebook search "virtue" --kind quotes
  quotebook digest --dry-run
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the database schema
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Run the REST API and the mail digest until Ctrl-C
    Serve,

    /// Send one quote digest now
    Digest {
        /// Print the message instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show row counts for every table
    Stats,

    /// Search topics, authors, languages, books and quotes
    Search {
        /// Text to look for
        text: String,

        /// Only search one kind (topic, author, language, book, quote)
        #[arg(short, long)]
        kind: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut settings = config::load_or_default(Some(&config_path))?;
    if let Some(database) = cli.database {
        settings.database = database;
    }

    match cli.command {
        Commands::Init { force } => {
            config::write_config(&config_path, &settings, force)?;
            ui::success(&format!("Config written to {}", config_path.display()));

            let store = open_store(&settings.database)?;
            store.close()?;
            ui::info("Database", &settings.database.display().to_string());
        }

        Commands::Serve => {
            let store = open_store(&settings.database)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(serve(&settings, store.clone()));
            store.close()?;
            result?;
        }

        Commands::Digest { dry_run } => {
            let Some(mail) = settings.mail.clone() else {
                anyhow::bail!("no [mail] section in {}", config_path.display());
            };
            let store = open_store(&settings.database)?;
            let job = DigestJob::new(store.clone(), mail);

            if dry_run {
                match job.prepare()? {
                    Some(envelope) => {
                        ui::section("Digest");
                        ui::summary_row("To:", &envelope.to.join(" "));
                        println!();
                        println!("{}", envelope.message);
                    }
                    None => ui::warn("No quotes stored yet"),
                }
            } else {
                let runtime = tokio::runtime::Runtime::new()?;
                if runtime.block_on(job.run_once())? {
                    ui::success(&format!("{} Digest sent", Icons::MAIL));
                } else {
                    ui::warn("No quotes stored yet, nothing sent");
                }
            }
            store.close()?;
        }

        Commands::Stats => {
            let store = open_store(&settings.database)?;
            let stats = store.stats()?;
            let table = StatsTable::new(&stats);

            ui::header(&format!("{} Database: {}", Icons::STATS, settings.database.display()));
            println!("{}", table.build());
            ui::summary_row("Total rows:", &table.total().to_string());
            store.close()?;
        }

        Commands::Search { text, kind } => {
            let kinds = match kind {
                Some(kind) => vec![kind.parse::<EntityKind>()?],
                None => EntityKind::all().to_vec(),
            };

            let store = open_store(&settings.database)?;
            println!("{} Searching for: '{}'...", Icons::SEARCH, text);
            let found = search(&store, &text, &kinds)?;
            if found == 0 {
                ui::warn("Nothing found.");
            }
            store.close()?;
        }
    }

    Ok(())
}

fn open_store(database: &Path) -> anyhow::Result<Store> {
    config::ensure_db_dir(database)?;
    let store = Store::open(database)?;
    tracing::debug!(database = %database.display(), "Store opened");
    Ok(store)
}

async fn serve(settings: &QuotebookConfig, store: Store) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let digest = match &settings.mail {
        Some(mail) if mail.enabled => {
            let job = DigestJob::new(store.clone(), mail.clone());
            Some(tokio::spawn(job.run(shutdown_rx)))
        }
        _ => {
            tracing::info!("Mail digest disabled");
            None
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
        tracing::info!("Shutdown requested");
    };
    let served = quotebook::server::start_server(&settings.server, store, shutdown).await;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = digest {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Digest job ended abnormally");
        }
    }

    served
}

/// Print matches for every kind; returns how many entities were found.
fn search(store: &Store, text: &str, kinds: &[EntityKind]) -> anyhow::Result<usize> {
    let mut found = 0;

    for kind in kinds {
        match kind {
            EntityKind::Topic => {
                let topics = store.search_topics(text)?;
                found += topics.len();
                if !topics.is_empty() {
                    ui::section("Topics");
                    for topic in topics {
                        println!("{} [{}] {}", Icons::TOPIC, topic.id, topic.label);
                    }
                }
            }
            EntityKind::Author => {
                let authors = store.search_authors(text)?;
                found += authors.len();
                if !authors.is_empty() {
                    ui::section("Authors");
                    for author in authors {
                        println!("{} [{}] {}", Icons::PERSON, author.id, author.name);
                    }
                }
            }
            EntityKind::Language => {
                let languages = store.search_languages(text)?;
                found += languages.len();
                if !languages.is_empty() {
                    ui::section("Languages");
                    for language in languages {
                        println!("{} [{}] {}", Icons::LANGUAGE, language.id, language.label);
                    }
                }
            }
            EntityKind::Book => {
                let books = store.search_books(text)?;
                found += books.len();
                if !books.is_empty() {
                    ui::section(&format!("{} Books", Icons::BOOK));
                    println!("{}", ui::books_table(&books));
                }
            }
            EntityKind::Quote => {
                let quotes = store.search_quotes(text)?;
                found += quotes.len();
                if !quotes.is_empty() {
                    ui::section("Quotes");
                    for quote in &quotes {
                        ui::quote_line(quote);
                    }
                }
            }
        }
    }

    Ok(found)
}
