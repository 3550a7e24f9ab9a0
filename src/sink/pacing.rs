// src/sink/pacing.rs
use std::time::Duration;

/// Delays between sink calls, to stay under the store's rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub after_create: Duration,
    pub after_step: Duration,
    pub after_batch: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        let one = Duration::from_secs(1);
        Self {
            after_create: one,
            after_step: one,
            after_batch: one,
        }
    }
}

impl PacingPolicy {
    pub fn none() -> Self {
        Self {
            after_create: Duration::ZERO,
            after_step: Duration::ZERO,
            after_batch: Duration::ZERO,
        }
    }

    pub async fn after_create(&self) {
        pause(self.after_create).await;
    }

    pub async fn after_step(&self) {
        pause(self.after_step).await;
    }

    pub async fn after_batch(&self) {
        pause(self.after_batch).await;
    }
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}
