// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use projection_sync::feed::{FeedBrowser, FeedSession};
use projection_sync::normalize::{LeagueResultSet, ProjectionRecord};
use projection_sync::AcquisitionError;

pub const FEED_NBA: &str = include_str!("../fixtures/feed_nba.json");
pub const LEAGUES: &str = include_str!("../fixtures/league.json");

/// Browser whose first `fail_first` sessions error out; later ones return `body`.
pub struct ScriptedBrowser {
    pub fail_first: u32,
    pub hang: bool,
    pub body: String,
    pub opens: AtomicU32,
    pub closes: Arc<AtomicU32>,
}

impl ScriptedBrowser {
    pub fn new(fail_first: u32, body: &str) -> Self {
        Self {
            fail_first,
            hang: false,
            body: body.to_string(),
            opens: AtomicU32::new(0),
            closes: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Every fetch sleeps for a minute.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(0, "{}")
        }
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedBrowser for ScriptedBrowser {
    async fn open(&self) -> Result<Box<dyn FeedSession>, AcquisitionError> {
        let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(ScriptedSession {
            fail: n <= self.fail_first,
            hang: self.hang,
            body: self.body.clone(),
            closes: self.closes.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedSession {
    fail: bool,
    hang: bool,
    body: String,
    closes: Arc<AtomicU32>,
}

#[async_trait]
impl FeedSession for ScriptedSession {
    async fn fetch_document(&mut self, _url: &str) -> Result<String, AcquisitionError> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.fail {
            return Err(AcquisitionError::Fetch("navigation failed".into()));
        }
        Ok(self.body.clone())
    }

    async fn close(self: Box<Self>) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn record(player: &str, game: &str, value: f64) -> ProjectionRecord {
    ProjectionRecord {
        player: player.to_string(),
        team: "TEAM".to_string(),
        versus: "OPP".to_string(),
        stat: "Points".to_string(),
        value,
        flash_sale_value: None,
        game: game.to_string(),
        last_updated_at: None,
    }
}

/// `n` rows for `league`, numbered by value.
pub fn result_set(leagues: &[(&str, usize)]) -> LeagueResultSet {
    let mut set = LeagueResultSet::new();
    for (league, n) in leagues {
        for i in 0..*n {
            set.push(league, record(&format!("p{i}"), league, i as f64));
        }
    }
    set
}
