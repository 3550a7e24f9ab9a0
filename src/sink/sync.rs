// src/sink/sync.rs
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{Cell, PacingPolicy, TableStore, HEADER_ROW};
use crate::error::{SinkError, SinkOp};
use crate::normalize::{LeagueResultSet, ProjectionRecord};

pub const DEFAULT_BATCH_SIZE: usize = 500;
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeagueWrite {
    pub league: String,
    pub rows: usize,
    pub batches: usize,
    pub created: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub leagues: Vec<LeagueWrite>,
}

impl SyncReport {
    pub fn total_rows(&self) -> usize {
        self.leagues.iter().map(|l| l.rows).sum()
    }
}

/// Full-replace writer: per league, clear → header → batched appends.
pub struct Synchronizer {
    store: Arc<dyn TableStore>,
    pacing: PacingPolicy,
    batch_size: usize,
    call_timeout: Duration,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            pacing: PacingPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            call_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    pub fn with_call_timeout(mut self, d: Duration) -> Self {
        self.call_timeout = d;
        self
    }

    /// Each league's records get `last_updated_at` set to the local time at
    /// which that league is written; the sheet rows carry the same stamp.
    pub async fn synchronize(
        &self,
        results: &mut LeagueResultSet,
    ) -> Result<SyncReport, SinkError> {
        self.run(results, || {
            chrono::Local::now().format(STAMP_FORMAT).to_string()
        })
        .await
    }

    /// Same as [`synchronize`](Self::synchronize) with a fixed stamp.
    pub async fn synchronize_at(
        &self,
        results: &mut LeagueResultSet,
        stamp: &str,
    ) -> Result<SyncReport, SinkError> {
        self.run(results, || stamp.to_string()).await
    }

    async fn run<F>(&self, results: &mut LeagueResultSet, stamp: F) -> Result<SyncReport, SinkError>
    where
        F: Fn() -> String,
    {
        tracing::info!(store = self.store.name(), "connecting to sink");
        self.bounded(self.store.name(), SinkOp::Connect, self.store.connect())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "sink connection failed");
                e
            })?;
        tracing::info!(store = self.store.name(), leagues = results.len(), "sink connected");

        let mut report = SyncReport::default();
        for (league, records) in results.iter_mut() {
            let stamp = stamp();
            for r in records.iter_mut() {
                r.last_updated_at = Some(stamp.clone());
            }
            let written = self.write_league(league, records).await?;
            report.leagues.push(written);
        }
        Ok(report)
    }

    async fn write_league(
        &self,
        league: &str,
        records: &[ProjectionRecord],
    ) -> Result<LeagueWrite, SinkError> {
        let store = &self.store;

        let exists = self
            .bounded(league, SinkOp::Lookup, store.has_table(league))
            .await?;
        if !exists {
            tracing::info!(league, "creating sheet");
            self.bounded(league, SinkOp::Create, store.create_table(league))
                .await?;
            self.pacing.after_create().await;
        }

        tracing::info!(league, rows = records.len(), "updating sheet");
        self.bounded(league, SinkOp::Clear, store.clear_table(league))
            .await?;
        self.pacing.after_step().await;

        self.bounded(
            league,
            SinkOp::Header,
            store.set_header_row(league, &HEADER_ROW),
        )
        .await?;
        self.pacing.after_step().await;

        let rows: Vec<Vec<Cell>> = records.iter().map(to_row).collect();
        let mut batches = 0usize;
        for (i, batch) in rows.chunks(self.batch_size).enumerate() {
            let first = i * self.batch_size + 1;
            self.bounded(league, SinkOp::Append, store.append_rows(league, batch))
                .await?;
            batches += 1;
            counter!("sink_rows_appended_total").increment(batch.len() as u64);
            tracing::info!(
                league,
                from = first,
                to = first + batch.len() - 1,
                "rows appended"
            );
            self.pacing.after_batch().await;
        }

        tracing::info!(league, rows = rows.len(), batches, "finished updating sheet");
        Ok(LeagueWrite {
            league: league.to_string(),
            rows: rows.len(),
            batches,
            created: !exists,
        })
    }

    async fn bounded<T, F>(&self, league: &str, op: SinkOp, fut: F) -> Result<T, SinkError>
    where
        F: Future<Output = Result<T, SinkError>>,
    {
        counter!("sink_calls_total", "op" => op.to_string()).increment(1);
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(SinkError::Timeout {
                league: league.to_string(),
                op,
            }),
        }
    }
}

pub fn to_row(r: &ProjectionRecord) -> Vec<Cell> {
    vec![
        Cell::from(r.player.as_str()),
        Cell::from(r.team.as_str()),
        Cell::from(r.versus.as_str()),
        Cell::from(r.stat.as_str()),
        Cell::Number(r.value),
        Cell::from(r.flash_sale_value),
        Cell::from(r.game.as_str()),
        r.last_updated_at.as_deref().map_or(Cell::Empty, Cell::from),
    ]
}
