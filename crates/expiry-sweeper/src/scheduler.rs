//! Periodic driver for the sweeper.

use crate::sweeper::{SweepReport, Sweeper};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{path::PathBuf, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

/// Interval used when none (or zero) is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of the most recent completed pass.
#[derive(Debug, Clone, Serialize)]
pub struct SweepStatus {
    pub finished_at: DateTime<Utc>,
    pub report: SweepReport,
}

/// Runs a [`Sweeper`] over one root directory on a fixed interval.
///
/// The first pass happens one interval after [`SweepScheduler::run`] starts.
/// Cancellation is only observed between passes, so a pass in progress always
/// runs to completion.
#[derive(Debug)]
pub struct SweepScheduler {
    sweeper: Sweeper,
    root: PathBuf,
    interval: Duration,
    status_tx: watch::Sender<Option<SweepStatus>>,
}

impl SweepScheduler {
    #[must_use]
    pub fn new(sweeper: Sweeper, root: PathBuf, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(
                "Sweep interval of zero is not allowed, using {:?}",
                DEFAULT_SWEEP_INTERVAL
            );
            DEFAULT_SWEEP_INTERVAL
        } else {
            interval
        };
        let (status_tx, _) = watch::channel(None);

        Self {
            sweeper,
            root,
            interval,
            status_tx,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Receiver that observes the status of each completed pass.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<Option<SweepStatus>> {
        self.status_tx.subscribe()
    }

    /// Run until `cancellation_token` is cancelled.
    pub async fn run(self, cancellation_token: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the immediate first tick so the first pass lands at T+interval
        ticker.tick().await;

        tracing::info!(
            "File sweep task started for {:?}: every {:?}, expiry {:?}{}",
            self.root,
            self.interval,
            self.sweeper.policy().expiry(),
            if self.sweeper.policy().is_disabled() {
                " (disabled)"
            } else {
                ""
            }
        );

        loop {
            tokio::select! {
                biased;
                () = cancellation_token.cancelled() => {
                    tracing::info!("File sweep task received cancellation signal, shutting down");
                    break;
                }
                _ = ticker.tick() => {}
            }

            self.run_pass().await;
        }

        tracing::info!("File sweep task stopped");
    }

    /// Spawn [`SweepScheduler::run`] onto the current runtime.
    pub fn spawn(self, cancellation_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancellation_token))
    }

    async fn run_pass(&self) {
        match self.sweeper.sweep_async(self.root.clone()).await {
            Ok(report) => {
                self.status_tx.send_replace(Some(SweepStatus {
                    finished_at: Utc::now(),
                    report,
                }));
            }
            Err(e) => {
                tracing::error!("Error during file sweep: {}", e);
            }
        }
    }
}
