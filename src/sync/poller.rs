//! Background sync poller.
//!
//! Runs the sync job immediately, then every `interval`. `SyncHandle::trigger`
//! wakes it for an on-demand run and `SyncHandle::cancel` stops future runs.
//! Runs execute one at a time inside the task; a trigger that arrives
//! mid-run starts the next run as soon as the current one ends.
//!
//! Periodic runs start on a fixed schedule measured from poller start, so a
//! slow run does not push later runs back. A run that overshoots its slot
//! delays the next tick instead of triggering a burst of catch-up runs. On-demand
//! runs do not move the schedule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::sheets_api::SheetsApi;
use crate::types::Config;
use crate::watermark::WatermarkStore;

use super::{run_sync_job, SyncReport};

/// Counters shared between the poller task and its handle.
#[derive(Debug, Default)]
pub struct PollerStats {
    runs: AtomicU64,
    aborted: AtomicU64,
    last_report: Mutex<Option<SyncReport>>,
}

impl PollerStats {
    /// Completed runs, aborted ones included.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Runs that ended with an error (master or directory unreadable).
    pub fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn last_report(&self) -> Option<SyncReport> {
        self.last_report.lock().clone()
    }
}

pub struct SyncHandle {
    wake: Arc<Notify>,
    cancel: watch::Sender<bool>,
    stats: Arc<PollerStats>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Request a run now instead of waiting for the next tick.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Stop scheduling runs. A run already in progress finishes.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn stats(&self) -> Arc<PollerStats> {
        self.stats.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poller task to exit (after `cancel`).
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            log::warn!("Sheet sync poller task ended abnormally: {}", e);
        }
    }
}

/// Spawn the poller on the current tokio runtime.
pub fn spawn_sync_poller(
    api: Arc<dyn SheetsApi>,
    store: Arc<dyn WatermarkStore>,
    config: Arc<Config>,
    interval: Duration,
) -> SyncHandle {
    let wake = Arc::new(Notify::new());
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let stats = Arc::new(PollerStats::default());

    let task = tokio::spawn(run_sync_poller(
        api,
        store,
        config,
        interval,
        wake.clone(),
        cancel_rx,
        stats.clone(),
    ));

    SyncHandle {
        wake,
        cancel: cancel_tx,
        stats,
        task,
    }
}

async fn run_sync_poller(
    api: Arc<dyn SheetsApi>,
    store: Arc<dyn WatermarkStore>,
    config: Arc<Config>,
    interval: Duration,
    wake: Arc<Notify>,
    mut cancel: watch::Receiver<bool>,
    stats: Arc<PollerStats>,
) {
    log::info!(
        "Sheet sync poller: started (every {}s)",
        interval.as_secs()
    );

    let mut ticker = delayed_ticker(interval);
    // The first tick completes immediately; that is the startup run.
    ticker.tick().await;

    loop {
        if *cancel.borrow() {
            break;
        }

        match run_sync_job(api.as_ref(), store.as_ref(), &config).await {
            Ok(report) => {
                if !report.is_noop() {
                    log::info!("Sheet sync poller: run {} {}", report.id, report.summary());
                }
                *stats.last_report.lock() = Some(report);
            }
            Err(e) => {
                stats.aborted.fetch_add(1, Ordering::SeqCst);
                log::warn!(
                    "Sheet sync poller: run failed: {} ({})",
                    e,
                    e.recovery_suggestion()
                );
            }
        }
        stats.runs.fetch_add(1, Ordering::SeqCst);

        tokio::select! {
            _ = ticker.tick() => {},
            _ = wake.notified() => {
                log::info!("Sheet sync poller: woken for on-demand run");
            },
            changed = cancel.changed() => {
                // A dropped handle also stops the poller.
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            },
        }
    }

    log::info!("Sheet sync poller: stopped");
}

fn delayed_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
