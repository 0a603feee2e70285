//! Root publication with per-attempt timeouts and bounded retries.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rootsync_core::{Clock, PublicationRecord, RealClock, Root};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    error::{PublishError, Result},
    ledger::Ledger,
    retry::{RetryDecision, RetryPolicy},
};

/// Publisher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Upper bound on a single ledger call, receipt wait included.
    pub attempt_timeout: Duration,
    /// Backoff between transient failures.
    pub retry_policy: RetryPolicy,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self { attempt_timeout: Duration::from_secs(90), retry_policy: RetryPolicy::default() }
    }
}

/// Proof that the ledger accepted a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Root the ledger now holds.
    pub root: Root,
    /// Ledger-side identifier of the write.
    pub confirmation_id: String,
    /// Attempts it took, counting the successful one.
    pub attempts: u32,
    /// When the confirmation arrived.
    pub confirmed_at: DateTime<Utc>,
}

impl Receipt {
    /// The durable form of this receipt.
    pub fn to_record(&self) -> PublicationRecord {
        PublicationRecord {
            root: self.root,
            confirmation_id: self.confirmation_id.clone(),
            confirmed_at: self.confirmed_at,
        }
    }
}

/// Pushes roots to a `Ledger`.
///
/// Transient failures and timeouts are retried according to the retry
/// policy; permanent failures return immediately. Once the attempt budget is
/// spent the last error is wrapped in `PublishError::RetriesExhausted`.
#[derive(Clone)]
pub struct RootPublisher {
    ledger: Arc<dyn Ledger>,
    config: PublisherConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RootPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootPublisher").field("config", &self.config).finish_non_exhaustive()
    }
}

impl RootPublisher {
    /// Creates a publisher using the real clock.
    pub fn new(ledger: Arc<dyn Ledger>, config: PublisherConfig) -> Self {
        Self::with_clock(ledger, config, Arc::new(RealClock::new()))
    }

    /// Creates a publisher with an injected clock.
    pub fn with_clock(ledger: Arc<dyn Ledger>, config: PublisherConfig, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, config, clock }
    }

    /// Publisher settings.
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publishes `root` to the ledger.
    ///
    /// Publishing a root the ledger already holds is harmless, so callers
    /// may call this again after any failure.
    ///
    /// # Errors
    ///
    /// - `PublishError::PermanentFailure` if the ledger rejected the root
    /// - `PublishError::RetriesExhausted` if every attempt failed transiently
    #[instrument(name = "publish_root", skip(self), fields(root = %root))]
    pub async fn publish(&self, root: Root) -> Result<Receipt> {
        let policy = &self.config.retry_policy;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let error = match self.attempt(root).await {
                Ok(confirmation) => {
                    info!(attempt, confirmation_id = %confirmation.confirmation_id, "root published");
                    return Ok(Receipt {
                        root: confirmation.root,
                        confirmation_id: confirmation.confirmation_id,
                        attempts: attempt,
                        confirmed_at: self.clock.now(),
                    });
                },
                Err(error) => error,
            };

            match policy.decide(attempt, &error) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "publication attempt failed, retrying"
                    );
                    self.clock.sleep(delay).await;
                },
                RetryDecision::GiveUp { reason } => {
                    warn!(attempt, error = %error, reason = %reason, "giving up on publication");
                    return Err(if error.is_retryable() {
                        PublishError::RetriesExhausted { attempts: attempt, last_error: Box::new(error) }
                    } else {
                        error
                    });
                },
            }
        }
    }

    async fn attempt(&self, root: Root) -> Result<crate::ledger::LedgerConfirmation> {
        let timeout = self.config.attempt_timeout;
        match tokio::time::timeout(timeout, self.ledger.set_root(root)).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::timeout(timeout)),
        }
    }
}
