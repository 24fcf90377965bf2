//! The relay loop.
//!
//! Owns the cursor and drives fetch → deliver → advance → sleep cycles until
//! stopped. Exactly one cycle is in flight at a time, deliveries within a
//! batch run sequentially in the order received, and no per-cycle failure
//! ends the loop.
//!
//! Stopping cancels the sleep between cycles. A fetch or delivery that is
//! already running is allowed to finish, and the cursor returned by
//! [`RelayHandle::join`] reflects the last completed cycle.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tgrelay_proto::{
    Cursor, DeliveryError, DeliveryResult, DeliverySink, FetchError, FetchResult, Update,
    UpdateSource, max_update_id,
};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::LoopConfig;

/// Outcome of one relay cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleReport {
    /// The fetch failed; nothing was delivered and the cursor did not move.
    FetchFailed,
    /// The fetch returned no updates.
    Empty,
    /// A batch was fetched and every new update in it was attempted.
    Relayed {
        received: usize,
        delivered: usize,
        failed: usize,
        /// Updates below the cursor, already attempted in an earlier cycle.
        skipped: usize,
    },
}

/// Polls an [`UpdateSource`] and forwards every update to a [`DeliverySink`].
pub struct RelayLoop {
    source: Arc<dyn UpdateSource>,
    sink: Arc<dyn DeliverySink>,
    cursor: Cursor,
    backoff: Backoff,
}

impl RelayLoop {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        sink: Arc<dyn DeliverySink>,
        settings: &LoopConfig,
    ) -> Self {
        Self {
            source,
            sink,
            cursor: Cursor::UNSET,
            backoff: Backoff::new(settings.poll_interval(), settings.max_backoff()),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// How long the loop waits before the next cycle.
    pub fn next_delay(&self) -> Duration {
        self.backoff.delay()
    }

    /// Run a single fetch-and-deliver cycle. Never fails.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let batch = match self.fetch().await {
            Ok(batch) => batch,
            Err(error) => {
                self.backoff.record_failure();
                warn!(
                    error = %error,
                    cursor = %self.cursor,
                    consecutive_failures = self.backoff.consecutive_failures(),
                    "Failed to fetch updates"
                );
                return CycleReport::FetchFailed;
            }
        };
        self.backoff.record_success();

        if batch.is_empty() {
            return CycleReport::Empty;
        }

        let max_id = max_update_id(&batch);
        let mut delivered = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for update in &batch {
            if self
                .cursor
                .offset()
                .is_some_and(|offset| update.update_id < offset)
            {
                debug!(
                    update_id = update.update_id,
                    cursor = %self.cursor,
                    "Skipping update below cursor"
                );
                skipped += 1;
                continue;
            }

            match self.deliver(update).await {
                Ok(()) => {
                    debug!(update_id = update.update_id, "Update delivered");
                    delivered += 1;
                }
                Err(error) => {
                    warn!(
                        update_id = update.update_id,
                        error = %error,
                        "Failed to deliver update"
                    );
                    failed += 1;
                }
            }
        }

        self.cursor = self.cursor.advance(max_id);
        info!(
            received = batch.len(),
            delivered,
            failed,
            skipped,
            cursor = %self.cursor,
            "Relayed batch"
        );

        CycleReport::Relayed {
            received: batch.len(),
            delivered,
            failed,
            skipped,
        }
    }

    /// One fetch attempt. A panicking source counts as a failed fetch.
    async fn fetch(&self) -> FetchResult<Vec<Update>> {
        match AssertUnwindSafe(self.source.fetch(self.cursor)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(FetchError::Aborted(panic_message(panic.as_ref()))),
        }
    }

    /// One delivery attempt. A panicking sink counts as a failed attempt.
    async fn deliver(&self, update: &Update) -> DeliveryResult<()> {
        match AssertUnwindSafe(self.sink.send(update)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(DeliveryError::Aborted(panic_message(panic.as_ref()))),
        }
    }

    /// Run cycles until `shutdown` is cancelled, then return the final cursor.
    pub async fn run(mut self, shutdown: CancellationToken) -> Cursor {
        info!(cursor = %self.cursor, "Relay loop started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let report = self.run_cycle().await;
            let delay = self.next_delay();
            debug!(
                report = ?report,
                cursor = %self.cursor,
                delay_ms = delay.as_millis() as u64,
                "Cycle complete"
            );

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        info!(cursor = %self.cursor, "Relay loop stopped");
        self.cursor
    }

    /// Start the loop on its own task.
    pub fn spawn(self) -> RelayHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(shutdown.clone()));
        RelayHandle { shutdown, task }
    }
}

/// Handle to a spawned [`RelayLoop`].
#[derive(Debug)]
pub struct RelayHandle {
    shutdown: CancellationToken,
    task: JoinHandle<Cursor>,
}

impl RelayHandle {
    /// Prevent any further cycle from being scheduled. Idempotent.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Wait for the loop to exit and return its final cursor.
    pub async fn join(self) -> Result<Cursor, JoinError> {
        self.task.await
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
