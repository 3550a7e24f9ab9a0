//! One acquire → resolve → normalize → snapshot → synchronize pass.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::CycleError;
use crate::feed::{Acquirer, FeedBrowser, LeagueCatalog};
use crate::normalize::{normalize, write_snapshot, CycleSummary};
use crate::resolve::resolve;
use crate::sink::{SyncReport, Synchronizer, TableStore};

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: CycleSummary,
    pub sync: SyncReport,
}

impl CycleReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Whatever the scheduler runs once per tick.
#[async_trait]
pub trait Cycle: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleReport, CycleError>;
}

pub struct Pipeline {
    acquirer: Acquirer,
    catalog_path: PathBuf,
    snapshot_path: PathBuf,
    synchronizer: Synchronizer,
}

impl Pipeline {
    pub fn new(
        acquirer: Acquirer,
        catalog_path: impl Into<PathBuf>,
        snapshot_path: impl Into<PathBuf>,
        synchronizer: Synchronizer,
    ) -> Self {
        Self {
            acquirer,
            catalog_path: catalog_path.into(),
            snapshot_path: snapshot_path.into(),
            synchronizer,
        }
    }

    pub fn from_config(
        cfg: &AppConfig,
        browser: Arc<dyn FeedBrowser>,
        store: Arc<dyn TableStore>,
    ) -> Self {
        let feed = &cfg.feed;
        let acquirer = Acquirer::new(browser, feed.url.clone())
            .with_timeout(Duration::from_millis(feed.timeout_ms))
            .with_max_attempts(feed.max_attempts)
            .with_backoff(Duration::from_millis(feed.retry_backoff_ms))
            .with_override_path(feed.override_path.clone());
        let synchronizer = Synchronizer::new(store)
            .with_pacing(cfg.sink.pacing.policy())
            .with_batch_size(cfg.sink.batch_size)
            .with_call_timeout(Duration::from_millis(cfg.sink.call_timeout_ms));
        Self::new(
            acquirer,
            feed.catalog_path.clone(),
            feed.snapshot_path.clone(),
            synchronizer,
        )
    }
}

#[async_trait]
impl Cycle for Pipeline {
    async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let started_at = Utc::now();

        let feed = self.acquirer.acquire().await.map_err(|e| {
            tracing::error!(stage = "acquire", error = %e, "stage failed");
            e
        })?;

        tracing::info!(stage = "resolve", "processing data");
        let catalog = LeagueCatalog::load(&self.catalog_path)
            .await
            .map_err(|e| {
                tracing::error!(stage = "resolve", error = %e, "stage failed");
                e
            })?;
        let tables = resolve(&feed, &catalog);
        let mut normalized = normalize(&feed, &tables);
        drop(feed);

        write_snapshot(&self.snapshot_path, &normalized.results)
            .await
            .map_err(|source| {
                tracing::error!(stage = "snapshot", error = %source, "stage failed");
                CycleError::Snapshot {
                    path: self.snapshot_path.display().to_string(),
                    source,
                }
            })?;

        let sync = self
            .synchronizer
            .synchronize(&mut normalized.results)
            .await
            .map_err(|e| {
                tracing::error!(stage = "synchronize", error = %e, "stage failed");
                e
            })?;
        tracing::info!(
            stage = "synchronize",
            leagues = sync.leagues.len(),
            rows = sync.total_rows(),
            "sheets updated"
        );

        Ok(CycleReport {
            started_at,
            finished_at: Utc::now(),
            summary: normalized.summary,
            sync,
        })
    }
}
