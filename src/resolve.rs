//! # Reference Resolver
//! Turns the feed's `included` bag into typed lookup tables. Pure; entries
//! that fail validation are left out and surface later as resolution gaps.

use serde::Deserialize;
use std::collections::HashMap;

use crate::feed::{LeagueCatalog, RawFeed};

pub const KIND_PLAYER: &str = "new_player";
pub const KIND_PLAYER_ALT: &str = "player";
pub const KIND_STAT_TYPE: &str = "stat_type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub display_name: String,
    pub team: String,
    pub position: Option<String>,
}

impl PlayerInfo {
    /// `"{team} - {position}"` when a position is known, otherwise just the team.
    pub fn team_position(&self) -> String {
        match self.position.as_deref().map(str::trim) {
            Some(pos) if !pos.is_empty() => format!("{} - {}", self.team, pos),
            _ => self.team.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlayerAttributes {
    display_name: Option<String>,
    // Some feeds send `team`, others only `team_name`.
    team: Option<String>,
    team_name: Option<String>,
    position: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatTypeAttributes {
    name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub players: HashMap<String, PlayerInfo>,
    pub stat_types: HashMap<String, String>,
    pub leagues: LeagueCatalog,
    /// `included` entries that were dropped (bad attributes or unknown kind).
    pub skipped: usize,
}

pub fn resolve(feed: &RawFeed, catalog: &LeagueCatalog) -> ReferenceTables {
    let mut players = HashMap::new();
    let mut stat_types = HashMap::new();
    let mut skipped = 0usize;

    for item in &feed.included {
        match item.kind.as_str() {
            KIND_PLAYER | KIND_PLAYER_ALT => match player_from(&item.attributes) {
                Some(p) => {
                    players.insert(item.id.clone(), p);
                }
                None => {
                    skipped += 1;
                    tracing::debug!(id = %item.id, "player entry missing name or team");
                }
            },
            KIND_STAT_TYPE => match stat_name_from(&item.attributes) {
                Some(name) => {
                    stat_types.insert(item.id.clone(), name);
                }
                None => {
                    skipped += 1;
                    tracing::debug!(id = %item.id, "stat type entry missing name");
                }
            },
            _ => skipped += 1,
        }
    }

    tracing::info!(
        players = players.len(),
        stat_types = stat_types.len(),
        leagues = catalog.len(),
        skipped,
        "reference tables built"
    );

    ReferenceTables {
        players,
        stat_types,
        leagues: catalog.clone(),
        skipped,
    }
}

fn player_from(v: &serde_json::Value) -> Option<PlayerInfo> {
    let attrs: PlayerAttributes = serde_json::from_value(v.clone()).ok()?;
    let display_name = attrs.display_name.filter(|s| !s.trim().is_empty())?;
    let team = attrs.team.or(attrs.team_name)?;
    Some(PlayerInfo {
        display_name,
        team,
        position: attrs.position,
    })
}

fn stat_name_from(v: &serde_json::Value) -> Option<String> {
    let attrs: StatTypeAttributes = serde_json::from_value(v.clone()).ok()?;
    attrs.name.filter(|s| !s.trim().is_empty())
}
