//! SMTP and log transports

use lettre::address::Envelope as SmtpEnvelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};

use super::{Envelope, MailConfig, MailError, MailTransport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Loopback relays may stay unencrypted when they offer no STARTTLS.
fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// SMTP submission through `lettre`.
///
/// Remote relays must upgrade with STARTTLS before any credentials are sent.
/// Loopback relays upgrade when the server offers it.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    timeout: Duration,
    require_tls: bool,
}

impl SmtpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            require_tls: !is_loopback(&host),
            host,
            port,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Authenticate before sending
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Limit for connecting and for each server reply
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Refuse to continue without STARTTLS, even on loopback
    pub fn with_required_tls(mut self, required: bool) -> Self {
        self.require_tls = required;
        self
    }

    /// Sender account and password as credentials; an empty password skips
    /// authentication.
    pub fn from_config(config: &MailConfig) -> Self {
        let transport = Self::new(&config.smtp_host, config.smtp_port);
        if config.password.is_empty() {
            transport
        } else {
            transport.with_credentials(&config.sender, &config.password)
        }
    }

    fn mailer(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let parameters = TlsParameters::new(self.host.clone())?;
        let tls = if self.require_tls {
            Tls::Required(parameters)
        } else {
            Tls::Opportunistic(parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
            .port(self.port)
            .tls(tls)
            .hello_name(ClientId::Domain("localhost".to_string()))
            .timeout(Some(self.timeout));
        if let Some((username, password)) = &self.credentials {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(builder.build())
    }
}

#[async_trait::async_trait]
impl MailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), MailError> {
        if envelope.to.is_empty() {
            return Err(MailError::NoReceivers);
        }

        let from: Address = envelope.from.parse()?;
        let to = envelope
            .to
            .iter()
            .map(|receiver| receiver.parse::<Address>())
            .collect::<Result<Vec<_>, _>>()?;
        let smtp_envelope = SmtpEnvelope::new(Some(from), to)?;

        debug!(host = %self.host, port = self.port, tls_required = self.require_tls, "Sending through SMTP");
        self.mailer()?
            .send_raw(&smtp_envelope, with_crlf(&envelope.message).as_bytes())
            .await?;

        info!(host = %self.host, receivers = envelope.to.len(), "Mail sent");
        Ok(())
    }
}

/// SMTP wants CRLF line endings; the final line break is added by the client.
fn with_crlf(message: &str) -> String {
    message.lines().collect::<Vec<_>>().join("\r\n")
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait::async_trait]
impl MailTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), MailError> {
        if envelope.to.is_empty() {
            return Err(MailError::NoReceivers);
        }
        info!(
            from = %envelope.from,
            to = %envelope.to.join(" "),
            message = %envelope.message,
            "Mail (log transport)"
        );
        Ok(())
    }
}
