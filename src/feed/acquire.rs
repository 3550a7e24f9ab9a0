// src/feed/acquire.rs
use metrics::counter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AcquisitionError;
use crate::feed::browser::FeedBrowser;
use crate::feed::types::RawFeed;

/// Retry-protected fetch of one cycle's feed.
pub struct Acquirer {
    browser: Arc<dyn FeedBrowser>,
    url: String,
    timeout: Duration,
    max_attempts: u32,
    backoff: Duration,
    override_path: Option<PathBuf>,
}

impl Acquirer {
    pub fn new(browser: Arc<dyn FeedBrowser>, url: impl Into<String>) -> Self {
        Self {
            browser,
            url: url.into(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff: Duration::ZERO,
            override_path: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub async fn acquire(&self) -> Result<RawFeed, AcquisitionError> {
        if let Some(feed) = self.load_override().await? {
            return Ok(feed);
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            counter!("feed_fetch_attempts_total").increment(1);
            tracing::info!(attempt, url = %self.url, browser = self.browser.name(), "fetching feed");

            match self.attempt_once().await {
                Ok(feed) => {
                    tracing::info!(
                        attempt,
                        projections = feed.data.len(),
                        included = feed.included.len(),
                        "feed fetched"
                    );
                    return Ok(feed);
                }
                Err(e) => {
                    counter!("feed_fetch_failures_total").increment(1);
                    tracing::warn!(attempt, error = %e, "feed fetch attempt failed");
                    if attempt >= self.max_attempts {
                        return Err(AcquisitionError::Exhausted {
                            attempts: attempt,
                            last: e.to_string(),
                        });
                    }
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
    }

    /// One session, opened and closed here regardless of outcome.
    async fn attempt_once(&self) -> Result<RawFeed, AcquisitionError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let mut session = tokio::time::timeout(self.timeout, self.browser.open())
            .await
            .map_err(|_| AcquisitionError::Timeout(timeout_ms))??;

        let fetched = tokio::time::timeout(self.timeout, session.fetch_document(&self.url)).await;
        session.close().await;

        let body = fetched.map_err(|_| AcquisitionError::Timeout(timeout_ms))??;
        parse_payload(&body)
    }

    async fn load_override(&self) -> Result<Option<RawFeed>, AcquisitionError> {
        let Some(path) = &self.override_path else {
            return Ok(None);
        };
        if tokio::fs::metadata(path).await.is_err() {
            return Ok(None);
        }
        tracing::info!(path = %path.display(), "using feed override, skipping network");
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| AcquisitionError::Override {
                    path: path.display().to_string(),
                    source,
                })?;
        Ok(Some(RawFeed::from_json(&content)?))
    }
}

pub fn parse_payload(body: &str) -> Result<RawFeed, AcquisitionError> {
    if body.trim().is_empty() {
        return Err(AcquisitionError::EmptyPayload);
    }
    Ok(RawFeed::from_json(body)?)
}
