//! Background repair of ledger divergence.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{error::WhitelistError, service::WhitelistService, sync::Publication};

/// Periodically resyncs the service while it is diverged.
///
/// Runs until its cancellation token fires.
#[derive(Debug)]
pub struct Reconciler {
    service: Arc<WhitelistService>,
    interval: Duration,
    cancellation_token: CancellationToken,
}

impl Reconciler {
    /// Creates a reconciler checking every `interval`.
    pub fn new(
        service: Arc<WhitelistService>,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { service, interval, cancellation_token }
    }

    /// Runs the reconciler on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until cancelled.
    pub async fn run(self) {
        info!(interval = ?self.interval, "reconciler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancellation_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.reconcile_once().await;
                },
            }
        }

        info!("reconciler stopped");
    }

    /// Resyncs once if the service is diverged or a confirmed record is
    /// still unsaved. Returns the publication outcome, or `None` when there
    /// was nothing to do.
    ///
    /// A root the ledger rejected (permanent or configuration failure) is
    /// left alone; only an explicit `resync` or a new mutation publishes
    /// again.
    pub async fn reconcile_once(&self) -> Option<Publication> {
        if !self.service.is_diverged().await && !self.service.has_unsaved_record().await {
            debug!("ledger in sync");
            return None;
        }

        if let Some(error) = self.service.last_publish_error().await {
            if !error.is_retryable() {
                debug!(error = %error, "ledger rejected the local root, awaiting manual resync");
                return None;
            }
        }

        match self.service.resync().await {
            Ok(publication) => {
                info!("ledger state repaired");
                Some(publication)
            },
            Err(error) => {
                warn!(error = %error, "resync failed, will retry");
                match error {
                    WhitelistError::Publish(error) => Some(Publication::Diverged { error }),
                    WhitelistError::Core(_) | WhitelistError::Commitment(_) => None,
                }
            },
        }
    }
}
