// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sink::PacingPolicy;

pub const ENV_CONFIG_PATH: &str = "PROJECTION_SYNC_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/projection_sync.toml";
const ENV_SHEETS_ID: &str = "GOOGLE_SHEETS_ID";
const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

fn default_feed_url() -> String {
    "https://api.prizepicks.com/projections".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}
fn default_fetch_timeout_ms() -> u64 {
    10_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_override_path() -> PathBuf {
    PathBuf::from("data.json")
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("league.json")
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("result.json")
}
fn default_interval_secs() -> u64 {
    3600
}
fn default_batch_size() -> usize {
    500
}
fn default_pause_ms() -> u64 {
    1_000
}
fn default_call_timeout_ms() -> u64 {
    30_000
}
fn default_credentials_path() -> PathBuf {
    PathBuf::from("creds.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between failed attempts. 0 retries immediately.
    #[serde(default)]
    pub retry_backoff_ms: u64,
    /// Manual replay file; when present the network is skipped.
    #[serde(default = "default_override_path")]
    pub override_path: PathBuf,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_fetch_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: 0,
            override_path: default_override_path(),
            catalog_path: default_catalog_path(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_pause_ms")]
    pub create_pause_ms: u64,
    #[serde(default = "default_pause_ms")]
    pub step_pause_ms: u64,
    #[serde(default = "default_pause_ms")]
    pub batch_pause_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            create_pause_ms: default_pause_ms(),
            step_pause_ms: default_pause_ms(),
            batch_pause_ms: default_pause_ms(),
        }
    }
}

impl PacingConfig {
    pub fn policy(&self) -> PacingPolicy {
        PacingPolicy {
            after_create: Duration::from_millis(self.create_pause_ms),
            after_step: Duration::from_millis(self.step_pause_ms),
            after_batch: Duration::from_millis(self.batch_pause_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Spreadsheet id. `GOOGLE_SHEETS_ID` wins when set.
    #[serde(default)]
    pub spreadsheet_id: String,
    /// Service-account key file. `GOOGLE_APPLICATION_CREDENTIALS` wins when set.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            credentials_path: default_credentials_path(),
            batch_size: default_batch_size(),
            call_timeout_ms: default_call_timeout_ms(),
            pacing: PacingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit TOML path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $PROJECTION_SYNC_CONFIG
    /// 2) config/projection_sync.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from(&pb)?
            } else {
                let mut cfg = Self::default();
                cfg.sanitize();
                cfg
            }
        };

        if let Ok(id) = std::env::var(ENV_SHEETS_ID) {
            let id = id.trim();
            if !id.is_empty() {
                cfg.sink.spreadsheet_id = id.to_string();
            }
        }
        if let Ok(p) = std::env::var(ENV_CREDENTIALS) {
            if !p.trim().is_empty() {
                cfg.sink.credentials_path = PathBuf::from(p.trim());
            }
        }
        Ok(cfg)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }

    fn sanitize(&mut self) {
        if self.feed.max_attempts == 0 {
            self.feed.max_attempts = default_max_attempts();
        }
        if self.sink.batch_size == 0 {
            self.sink.batch_size = default_batch_size();
        }
        if self.schedule.interval_secs == 0 {
            self.schedule.interval_secs = default_interval_secs();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.feed.max_attempts, 3);
        assert_eq!(cfg.feed.timeout_ms, 10_000);
        assert_eq!(cfg.sink.batch_size, 500);
        assert_eq!(cfg.sink.pacing.batch_pause_ms, 1_000);
        assert_eq!(cfg.schedule.interval_secs, 3600);
        assert_eq!(cfg.feed.override_path, PathBuf::from("data.json"));
        assert_eq!(cfg.sink.credentials_path, PathBuf::from("creds.json"));
    }

    #[test]
    fn zero_values_are_sanitized() {
        let mut cfg: AppConfig = toml::from_str(
            r#"
[feed]
max_attempts = 0
[sink]
batch_size = 0
[schedule]
interval_secs = 0
"#,
        )
        .unwrap();
        cfg.sanitize();
        assert_eq!(cfg.feed.max_attempts, 3);
        assert_eq!(cfg.sink.batch_size, 500);
        assert_eq!(cfg.schedule.interval_secs, 3600);
    }

    #[test]
    fn pacing_policy_from_millis() {
        let p = PacingConfig {
            create_pause_ms: 5,
            step_pause_ms: 0,
            batch_pause_ms: 250,
        }
        .policy();
        assert_eq!(p.after_create, Duration::from_millis(5));
        assert_eq!(p.after_step, Duration::ZERO);
        assert_eq!(p.after_batch, Duration::from_millis(250));
    }
}
