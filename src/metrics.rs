// src/metrics.rs
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

pub const ENV_METRICS_ADDR: &str = "PROJECTION_SYNC_METRICS_ADDR";

/// One-time metrics registration (so series show up on the exporter).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_cycles_total", "Cycles started.");
        describe_counter!("sync_cycle_failures_total", "Cycles that ended in an error.");
        describe_counter!("feed_fetch_attempts_total", "Feed fetch attempts.");
        describe_counter!("feed_fetch_failures_total", "Failed feed fetch attempts.");
        describe_counter!(
            "normalize_records_total",
            "Projection rows produced by normalization."
        );
        describe_counter!(
            "normalize_gaps_total",
            "Projections skipped for unresolvable references."
        );
        describe_counter!("sink_rows_appended_total", "Rows appended to the sink.");
        describe_counter!("sink_calls_total", "Sink calls, labelled by op.");
        describe_histogram!("sync_cycle_duration_ms", "Cycle wall time in milliseconds.");
        describe_gauge!("sync_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

/// Serve Prometheus text on `addr` when `PROJECTION_SYNC_METRICS_ADDR` is set.
/// Returns the bound address, or `None` when disabled.
pub fn install_from_env() -> anyhow::Result<Option<SocketAddr>> {
    let Ok(raw) = std::env::var(ENV_METRICS_ADDR) else {
        return Ok(None);
    };
    let addr: SocketAddr = raw
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{ENV_METRICS_ADDR}={raw}: {e}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus: install exporter: {e}"))?;
    ensure_described();
    Ok(Some(addr))
}
