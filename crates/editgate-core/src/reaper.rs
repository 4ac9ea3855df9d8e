//! Background expiry reaper
//!
//! Periodically sweeps the store and drops proposals nobody consumed in time.
//! Expiry semantics do not depend on it (take and peek check expiry lazily);
//! it only bounds memory held by abandoned proposals.

use crate::store::PendingProposalStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Counters published by the reaper task
#[derive(Debug, Default)]
struct ReaperCounters {
    sweeps: AtomicU64,
    reclaimed: AtomicU64,
}

/// Point-in-time reaper statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaperStats {
    /// Completed sweeps
    pub sweeps: u64,
    /// Proposals reclaimed across all sweeps
    pub reclaimed: u64,
}

/// Handle on the running reaper task
///
/// Dropping the handle closes the shutdown channel, which also stops the task.
#[derive(Debug)]
pub struct ExpiryReaper {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    counters: Arc<ReaperCounters>,
    interval: Duration,
}

impl ExpiryReaper {
    /// Start sweeping `store` every `interval`
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime, or if `interval` is zero.
    #[must_use]
    pub fn spawn(store: Arc<PendingProposalStore>, interval: Duration) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(ReaperCounters::default());
        let task = tokio::spawn(run(store, interval, shutdown_rx, Arc::clone(&counters)));
        tracing::debug!(interval_ms = interval.as_millis(), "expiry reaper started");
        Self {
            shutdown,
            task,
            counters,
            interval,
        }
    }

    /// Sweep interval
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current statistics
    #[must_use]
    pub fn stats(&self) -> ReaperStats {
        ReaperStats {
            sweeps: self.counters.sweeps.load(Ordering::Relaxed),
            reclaimed: self.counters.reclaimed.load(Ordering::Relaxed),
        }
    }

    /// Whether the task is still running
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the task to stop and wait for it
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "expiry reaper task ended abnormally");
        }
        tracing::debug!("expiry reaper stopped");
    }
}

async fn run(
    store: Arc<PendingProposalStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    counters: Arc<ReaperCounters>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so sweeps start one interval in.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = store.purge_expired();
                counters.sweeps.fetch_add(1, Ordering::Relaxed);
                if removed > 0 {
                    counters.reclaimed.fetch_add(removed as u64, Ordering::Relaxed);
                    tracing::debug!(removed, remaining = store.len(), "reaped expired proposals");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
