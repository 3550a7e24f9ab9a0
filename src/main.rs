//! projection-sync — binary entrypoint.
//! Loads config, wires the feed browser and sheet store, and runs the
//! hourly scheduler until Ctrl-C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use projection_sync::config::AppConfig;
use projection_sync::feed::HttpBrowser;
use projection_sync::sink::{MemoryStore, SheetsStore, TableStore};
use projection_sync::{metrics, Pipeline, Scheduler};

/// Coloured, level-prefixed console output. `PROJECTION_SYNC_LOG_JSON=1`
/// switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("projection_sync=info,warn"));

    let json = std::env::var("PROJECTION_SYNC_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

/// Sheets when a spreadsheet id and key file are both present; otherwise a
/// dry run against the in-memory store.
fn build_store(cfg: &AppConfig) -> Result<Arc<dyn TableStore>> {
    let creds = &cfg.sink.credentials_path;
    if cfg.sink.spreadsheet_id.trim().is_empty() || !creds.exists() {
        tracing::warn!(
            credentials = %creds.display(),
            "spreadsheet id or service-account key missing; writing to in-memory store (dry run)"
        );
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SheetsStore::from_service_account(&cfg.sink.spreadsheet_id, creds)
        .context("loading service-account credentials")?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().context("loading configuration")?;
    if let Some(addr) = metrics::install_from_env()? {
        tracing::info!(%addr, "metrics exporter listening");
    }

    let browser = HttpBrowser::new(&cfg.feed.user_agent).context("building feed client")?;
    let store = build_store(&cfg)?;
    let pipeline = Pipeline::from_config(&cfg, Arc::new(browser), store);

    let handle = Scheduler::new(Arc::new(pipeline), cfg.interval()).start();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("shutdown requested");
    handle.stop().await;
    Ok(())
}
