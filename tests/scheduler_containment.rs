// tests/scheduler_containment.rs
mod common;

use async_trait::async_trait;
use common::result_set;
use projection_sync::normalize::LeagueResultSet;
use projection_sync::sink::{MemoryStore, PacingPolicy, Synchronizer};
use projection_sync::{
    run_cycle_guarded, Cycle, CycleError, CycleReport, CycleSummary, Scheduler, SinkOp,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

/// Skips acquisition and pushes a fixed result set to the sink.
struct SyncOnly {
    sync: Synchronizer,
    results: LeagueResultSet,
    runs: AtomicUsize,
}

#[async_trait]
impl Cycle for SyncOnly {
    async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let started_at = chrono::Utc::now();
        let mut results = self.results.clone();
        let sync = self.sync.synchronize(&mut results).await?;
        Ok(CycleReport {
            started_at,
            finished_at: chrono::Utc::now(),
            summary: CycleSummary::default(),
            sync,
        })
    }
}

struct Panicky {
    runs: AtomicUsize,
}

#[async_trait]
impl Cycle for Panicky {
    async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        if self.runs.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first cycle blows up");
        }
        Ok(CycleReport {
            started_at: chrono::Utc::now(),
            finished_at: chrono::Utc::now(),
            summary: CycleSummary::default(),
            sync: Default::default(),
        })
    }
}

fn failing_on_mlb() -> (Arc<MemoryStore>, Arc<SyncOnly>) {
    let store = Arc::new(MemoryStore::new());
    store.fail_on("MLB", SinkOp::Append);
    let cycle = Arc::new(SyncOnly {
        sync: Synchronizer::new(store.clone()).with_pacing(PacingPolicy::none()),
        results: result_set(&[("NBA", 3), ("MLB", 3)]),
        runs: AtomicUsize::new(0),
    });
    (store, cycle)
}

#[tokio::test(start_paused = true)]
async fn mlb_failure_does_not_stop_next_cycle() {
    let (store, cycle) = failing_on_mlb();
    let handle = Scheduler::new(cycle.clone(), HOUR).start();

    tokio::time::sleep(HOUR * 2 + Duration::from_secs(60)).await;
    assert!(!handle.is_finished(), "loop must survive failing cycles");
    handle.stop().await;

    assert_eq!(cycle.runs.load(Ordering::SeqCst), 3);
    assert_eq!(store.table("NBA").unwrap().rows.len(), 3);
}

#[tokio::test]
async fn guarded_cycle_swallows_errors() {
    let (_store, cycle) = failing_on_mlb();
    assert!(run_cycle_guarded(cycle.clone()).await.is_none());
    assert!(run_cycle_guarded(cycle.clone()).await.is_none());
    assert_eq!(cycle.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn guarded_cycle_recovers_after_recovery_of_sink() {
    let (store, cycle) = failing_on_mlb();
    assert!(run_cycle_guarded(cycle.clone()).await.is_none());
    store.clear_failure();
    let report = run_cycle_guarded(cycle.clone()).await.expect("second cycle ok");
    assert_eq!(report.sync.total_rows(), 6);
}

#[tokio::test]
async fn panicking_cycle_is_contained() {
    let cycle = Arc::new(Panicky {
        runs: AtomicUsize::new(0),
    });
    assert!(run_cycle_guarded(cycle.clone()).await.is_none());
    assert!(run_cycle_guarded(cycle.clone()).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn stop_interrupts_the_sleep() {
    let (_store, cycle) = failing_on_mlb();
    let handle = Scheduler::new(cycle.clone(), HOUR).start();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let t0 = tokio::time::Instant::now();
    handle.stop().await;
    assert!(t0.elapsed() < HOUR);
    assert_eq!(cycle.runs.load(Ordering::SeqCst), 1);
}
