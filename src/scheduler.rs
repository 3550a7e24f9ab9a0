// src/scheduler.rs
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::pipeline::{Cycle, CycleReport};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

/// Runs a [`Cycle`] back to back with a fixed sleep in between. A failed or
/// panicking cycle is logged and the loop carries on; there is no backoff
/// and no failure cap.
pub struct Scheduler {
    cycle: Arc<dyn Cycle>,
    interval: Duration,
}

pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the loop to exit and wait for it. An in-flight cycle finishes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "scheduler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Scheduler {
    pub fn new(cycle: Arc<dyn Cycle>, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Spawn the loop; the first cycle starts immediately.
    pub fn start(self) -> SchedulerHandle {
        crate::metrics::ensure_described();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            tracing::info!(interval_secs = self.interval.as_secs(), "scheduler started");
            loop {
                if *stop_rx.borrow() {
                    break;
                }
                run_cycle_guarded(self.cycle.clone()).await;

                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = stop_rx.changed() => break,
                }
            }
            tracing::info!("scheduler stopped");
        });
        SchedulerHandle { stop_tx, task }
    }
}

/// Run one cycle with every failure contained. Returns the report on success.
pub async fn run_cycle_guarded(cycle: Arc<dyn Cycle>) -> Option<CycleReport> {
    let started = chrono::Utc::now();
    let t0 = std::time::Instant::now();
    tracing::info!(started_at = %started.to_rfc3339(), "cycle starting");
    counter!("sync_cycles_total").increment(1);

    // Own task so a panic inside the cycle is caught here as a JoinError.
    let outcome = tokio::spawn(async move { cycle.run_cycle().await }).await;

    let report = match outcome {
        Ok(Ok(report)) => {
            tracing::info!(
                entries = report.summary.total_entries,
                games = report.summary.distinct_leagues,
                gaps = report.summary.gaps,
                rows = report.sync.total_rows(),
                "cycle succeeded"
            );
            Some(report)
        }
        Ok(Err(e)) => {
            counter!("sync_cycle_failures_total").increment(1);
            tracing::error!(error = %e, "cycle failed");
            None
        }
        Err(e) => {
            counter!("sync_cycle_failures_total").increment(1);
            tracing::error!(error = %e, "cycle aborted");
            None
        }
    };

    let finished = chrono::Utc::now();
    let elapsed = t0.elapsed();
    histogram!("sync_cycle_duration_ms").record(elapsed.as_secs_f64() * 1_000.0);
    gauge!("sync_last_cycle_ts").set(finished.timestamp() as f64);
    tracing::info!(
        finished_at = %finished.to_rfc3339(),
        duration_secs = elapsed.as_secs_f64(),
        "cycle completed"
    );
    report
}
