//! Scheduled quote digest

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::{Envelope, MailConfig, MailError, MailTransport, compose_message, select_quotes};
use crate::storage::Store;

/// Reads quotes from the store and mails a random selection on a fixed
/// interval.
pub struct DigestJob {
    store: Store,
    config: MailConfig,
    transport: Arc<dyn MailTransport>,
}

impl DigestJob {
    /// Create a job using the transport named in `config`.
    pub fn new(store: Store, config: MailConfig) -> Self {
        let transport = config.build_transport();
        Self::with_transport(store, config, transport)
    }

    pub fn with_transport(store: Store, config: MailConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            store,
            config,
            transport,
        }
    }

    /// Compose the next digest, or `None` when there are no quotes yet.
    pub fn prepare(&self) -> Result<Option<Envelope>, MailError> {
        let quotes = self.store.get_quotes()?;
        if quotes.is_empty() {
            return Ok(None);
        }

        let selection = select_quotes(&quotes, self.config.selection_size, &mut rand::thread_rng());
        Ok(Some(Envelope {
            from: self.config.sender.clone(),
            to: self.config.receivers.clone(),
            message: compose_message(&self.config, &selection),
        }))
    }

    /// Send one digest now. Returns `false` when there was nothing to send.
    pub async fn run_once(&self) -> Result<bool, MailError> {
        let Some(envelope) = self.prepare()? else {
            warn!("No quotes stored, skipping digest");
            return Ok(false);
        };

        self.transport.send(&envelope).await?;
        info!(
            transport = self.transport.name(),
            receivers = envelope.to.len(),
            "Digest sent"
        );
        Ok(true)
    }

    /// Send a digest every interval until `shutdown` flips to `true`.
    ///
    /// Failures are logged and the next tick tries again.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.interval();
        let mut interval = tokio::time::interval(period);

        // Skip the first immediate tick
        interval.tick().await;

        info!(every = ?period, transport = self.transport.name(), "Digest scheduled");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Digest failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Digest job shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTransport {
        attempts: AtomicUsize,
        sent: Mutex<Vec<Envelope>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl MailTransport for RecordingTransport {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, envelope: &Envelope) -> Result<(), MailError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MailError::NoReceivers);
            }
            self.sent.lock().unwrap().push(envelope.clone());
            Ok(())
        }
    }

    fn config() -> MailConfig {
        MailConfig {
            sender: "quotes@example.org".to_string(),
            receivers: vec!["reader@example.org".to_string()],
            selection_size: 3,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_once_sends_selection() {
        let transport = Arc::new(RecordingTransport::default());
        let job = DigestJob::with_transport(fixture_store(), config(), transport.clone());

        assert!(job.run_once().await.unwrap());

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["reader@example.org".to_string()]);
        let body = sent[0].message.split("\r\n\r\n").nth(1).unwrap();
        assert_eq!(body.lines().count(), 3);
        assert!(body.lines().all(|l| l.starts_with("'Quote")));
    }

    #[tokio::test]
    async fn test_run_once_skips_empty_store() {
        let transport = Arc::new(RecordingTransport::default());
        let store = Store::open_in_memory().unwrap();
        let job = DigestJob::with_transport(store, config(), transport.clone());

        assert!(!job.run_once().await.unwrap());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_once_reports_transport_failure() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let job = DigestJob::with_transport(fixture_store(), config(), transport);

        assert!(job.run_once().await.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let job = DigestJob::with_transport(
            fixture_store(),
            config(),
            Arc::new(RecordingTransport::default()),
        );
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(job.run(rx));
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_going_after_failure() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let mut config = config();
        config.interval_hours = 1;
        let job = DigestJob::with_transport(fixture_store(), config, transport.clone());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(job.run(rx));
        tokio::time::sleep(Duration::from_secs(3 * 3600 + 1)).await;
        assert!(!handle.is_finished());
        assert!(transport.attempts.load(Ordering::SeqCst) >= 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
