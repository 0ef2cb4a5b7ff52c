//! Mail digest - a periodic email with a random selection of quotes
//!
//! Transports:
//! - `smtp`: SMTP through `lettre`, STARTTLS before authenticating
//! - `log`: writes the message to the log (development)

pub mod digest;
pub mod smtp;

pub use digest::DigestJob;
pub use smtp::{LogTransport, SmtpTransport};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::entity::Quote;

pub const SUBJECT: &str = "Quote-reminder";

/// Errors that can occur while building or sending a digest.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("No receivers configured")]
    NoReceivers,

    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Invalid envelope: {0}")]
    Envelope(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error(transparent)]
    Store(#[from] crate::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Smtp,
    Log,
}

/// `[mail]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub transport: TransportKind,
    pub sender: String,
    pub password: String,
    pub receivers: Vec<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub interval_hours: u64,
    pub selection_size: usize,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            transport: TransportKind::Smtp,
            sender: String::new(),
            password: String::new(),
            receivers: Vec::new(),
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            interval_hours: 24,
            selection_size: 5,
        }
    }
}

impl MailConfig {
    /// Time between two digests, at least one hour
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.max(1).saturating_mul(3600))
    }

    /// Build the transport named by `transport`.
    pub fn build_transport(&self) -> Arc<dyn MailTransport> {
        match self.transport {
            TransportKind::Smtp => Arc::new(SmtpTransport::from_config(self)),
            TransportKind::Log => Arc::new(LogTransport),
        }
    }
}

/// A composed message and its SMTP envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: Vec<String>,
    pub message: String,
}

#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    /// The name of this transport (used for logging).
    fn name(&self) -> &'static str;

    async fn send(&self, envelope: &Envelope) -> Result<(), MailError>;
}

/// Pick `count` quotes uniformly at random, with replacement.
pub fn select_quotes<'a, R: Rng + ?Sized>(quotes: &'a [Quote], count: usize, rng: &mut R) -> Vec<&'a Quote> {
    if quotes.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|_| &quotes[rng.gen_range(0..quotes.len())])
        .collect()
}

/// Render headers and one line per quote.
pub fn compose_message(config: &MailConfig, quotes: &[&Quote]) -> String {
    let mut message = format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\n\r\n",
        config.sender,
        config.receivers.join(" "),
        SUBJECT
    );
    for quote in quotes {
        message.push_str(&format!(
            "'{}' from '{}' by {}\n",
            quote.text, quote.book.title, quote.book.author.name
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config() -> MailConfig {
        MailConfig {
            sender: "quotes@example.org".to_string(),
            receivers: vec!["a@example.org".to_string(), "b@example.org".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_select_with_replacement() {
        let store = fixture_store();
        let quotes = store.get_quotes().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let picked = select_quotes(&quotes, 5, &mut rng);
        assert_eq!(picked.len(), 5);
        assert!(picked.iter().all(|q| q.id == 1 || q.id == 2));
    }

    #[test]
    fn test_select_from_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(select_quotes(&[], 5, &mut rng).is_empty());
    }

    #[test]
    fn test_compose_message() {
        let store = fixture_store();
        let quote = store.get_quote(1).unwrap().unwrap();

        let message = compose_message(&config(), &[&quote, &quote]);

        assert!(message.starts_with(
            "From: quotes@example.org\r\nTo: a@example.org b@example.org\r\nSubject: Quote-reminder\r\n\r\n"
        ));
        assert!(message.ends_with("'Quote1' from 'Book1' by Author1\n'Quote1' from 'Book1' by Author1\n"));
    }

    #[test]
    fn test_config_defaults_from_partial_toml() {
        let config: MailConfig = toml::from_str(
            r#"
            sender = "me@example.org"
            receivers = ["you@example.org"]
            transport = "log"
            "#,
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.transport, TransportKind::Log);
        assert_eq!(config.interval(), Duration::from_secs(24 * 3600));
        assert_eq!(config.selection_size, 5);
        assert_eq!(config.build_transport().name(), "log");
    }

    #[test]
    fn test_interval_has_floor() {
        let config = MailConfig {
            interval_hours: 0,
            ..Default::default()
        };
        assert_eq!(config.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_interval_saturates_on_huge_values() {
        let config = MailConfig {
            interval_hours: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.interval(), Duration::from_secs(u64::MAX));
    }
}
