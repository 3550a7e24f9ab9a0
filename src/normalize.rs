//! # Projection Normalizer
//! Joins every projection against the reference tables and groups the flat
//! rows by league display name. League keys keep first-appearance order and
//! rows keep feed order.
//!
//! A projection whose league, player or stat type cannot be resolved (or that
//! carries no line score) is skipped and reported as a [`ResolutionGap`];
//! the rest of the cycle carries on.

use metrics::counter;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::feed::types::ProjectionEntry;
use crate::feed::RawFeed;
use crate::resolve::ReferenceTables;

/// One flattened sheet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectionRecord {
    pub player: String,
    pub team: String,
    pub versus: String,
    pub stat: String,
    pub value: f64,
    pub flash_sale_value: Option<f64>,
    pub game: String,
    /// Stamped by the synchronizer, never by the normalizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<String>,
}

/// League name → rows, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeagueResultSet {
    leagues: Vec<(String, Vec<ProjectionRecord>)>,
    index: HashMap<String, usize>,
}

impl LeagueResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, league: &str, record: ProjectionRecord) {
        let idx = match self.index.get(league) {
            Some(&i) => i,
            None => {
                self.leagues.push((league.to_string(), Vec::new()));
                let i = self.leagues.len() - 1;
                self.index.insert(league.to_string(), i);
                i
            }
        };
        self.leagues[idx].1.push(record);
    }

    pub fn get(&self, league: &str) -> Option<&[ProjectionRecord]> {
        self.index
            .get(league)
            .map(|&i| self.leagues[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ProjectionRecord])> {
        self.leagues
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut [ProjectionRecord])> {
        self.leagues
            .iter_mut()
            .map(|(name, rows)| (name.as_str(), rows.as_mut_slice()))
    }

    pub fn league_names(&self) -> Vec<&str> {
        self.leagues.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.leagues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leagues.is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.leagues.iter().map(|(_, rows)| rows.len()).sum()
    }
}

impl Serialize for LeagueResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.leagues.len()))?;
        for (name, rows) in &self.leagues {
            map.serialize_entry(name, rows)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapKind {
    League,
    Player,
    StatType,
    LineScore,
}

impl std::fmt::Display for GapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GapKind::League => "league",
            GapKind::Player => "player",
            GapKind::StatType => "stat_type",
            GapKind::LineScore => "line_score",
        })
    }
}

/// A projection that referenced something the lookup tables do not have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionGap {
    pub projection_id: String,
    pub kind: GapKind,
    pub missing_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub total_entries: usize,
    pub distinct_leagues: usize,
    pub gaps: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub results: LeagueResultSet,
    pub summary: CycleSummary,
    pub gaps: Vec<ResolutionGap>,
}

pub fn normalize(feed: &RawFeed, tables: &ReferenceTables) -> Normalized {
    let mut results = LeagueResultSet::new();
    let mut gaps = Vec::new();
    let mut leagues_seen: BTreeSet<String> = BTreeSet::new();
    let mut total_entries = 0usize;

    for proj in &feed.data {
        match flatten(proj, tables) {
            Ok(record) => {
                let league = record.game.clone();
                results.push(&league, record);
                leagues_seen.insert(league);
                total_entries += 1;
            }
            Err(gap) => {
                tracing::warn!(
                    projection = %gap.projection_id,
                    kind = %gap.kind,
                    missing = gap.missing_id.as_deref().unwrap_or("-"),
                    "skipping unresolvable projection"
                );
                gaps.push(gap);
            }
        }
    }

    let summary = CycleSummary {
        total_entries,
        distinct_leagues: leagues_seen.len(),
        gaps: gaps.len(),
    };
    counter!("normalize_records_total").increment(total_entries as u64);
    counter!("normalize_gaps_total").increment(gaps.len() as u64);
    tracing::info!(
        total_entries = summary.total_entries,
        total_games = summary.distinct_leagues,
        gaps = summary.gaps,
        "projections normalized"
    );

    Normalized {
        results,
        summary,
        gaps,
    }
}

fn flatten(proj: &ProjectionEntry, t: &ReferenceTables) -> Result<ProjectionRecord, ResolutionGap> {
    let gap = |kind, missing: Option<&str>| ResolutionGap {
        projection_id: proj.id.clone(),
        kind,
        missing_id: missing.map(str::to_string),
    };
    let rel = &proj.relationships;

    let league_id = rel.league_id();
    let game = league_id
        .and_then(|id| t.leagues.name(id))
        .ok_or_else(|| gap(GapKind::League, league_id))?;

    let player_id = rel.player_id();
    let player = player_id
        .and_then(|id| t.players.get(id))
        .ok_or_else(|| gap(GapKind::Player, player_id))?;

    let stat_id = rel.stat_type_id();
    let stat = stat_id
        .and_then(|id| t.stat_types.get(id))
        .ok_or_else(|| gap(GapKind::StatType, stat_id))?;

    let value = proj
        .attributes
        .line_score
        .ok_or_else(|| gap(GapKind::LineScore, None))?;

    Ok(ProjectionRecord {
        player: player.display_name.clone(),
        team: player.team_position(),
        versus: proj.attributes.description.clone().unwrap_or_default(),
        stat: stat.clone(),
        value,
        flash_sale_value: proj.attributes.flash_sale_line_score,
        game: game.to_string(),
        last_updated_at: None,
    })
}

/// Pretty-printed `result.json` for inspection. Nothing reads it back.
pub async fn write_snapshot(path: &Path, results: &LeagueResultSet) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(results).map_err(std::io::Error::other)?;
    tokio::fs::write(path, json).await?;
    tracing::info!(path = %path.display(), leagues = results.len(), "snapshot saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::LeagueCatalog;
    use crate::resolve::resolve;

    fn feed() -> RawFeed {
        RawFeed::from_json(
            r#"{
              "data": [
                {"id":"a","attributes":{"description":"BOS","line_score":1.5},
                 "relationships":{"league":{"data":{"id":"2"}},"new_player":{"data":{"id":"p1"}},"stat_type":{"data":{"id":"s1"}}}},
                {"id":"b","attributes":{"description":"NYK","line_score":2.5,"flash_sale_line_score":1.0},
                 "relationships":{"league":{"data":{"id":"7"}},"new_player":{"data":{"id":"p2"}},"stat_type":{"data":{"id":"s1"}}}},
                {"id":"c","attributes":{"description":"TB","line_score":3.5},
                 "relationships":{"league":{"data":{"id":"2"}},"new_player":{"data":{"id":"p2"}},"stat_type":{"data":{"id":"s1"}}}},
                {"id":"d","attributes":{"description":"?","line_score":4.5},
                 "relationships":{"league":{"data":{"id":"2"}},"new_player":{"data":{"id":"ghost"}},"stat_type":{"data":{"id":"s1"}}}}
              ],
              "included": [
                {"type":"new_player","id":"p1","attributes":{"display_name":"One","team":"NYY","position":"P"}},
                {"type":"new_player","id":"p2","attributes":{"display_name":"Two","team":"LAL"}},
                {"type":"stat_type","id":"s1","attributes":{"name":"Points"}}
              ]
            }"#,
        )
        .unwrap()
    }

    fn normalized() -> Normalized {
        let cat = LeagueCatalog::from_pairs([("2", "MLB"), ("7", "NBA")]);
        let f = feed();
        normalize(&f, &resolve(&f, &cat))
    }

    #[test]
    fn groups_by_league_in_first_seen_order() {
        let n = normalized();
        assert_eq!(n.results.league_names(), vec!["MLB", "NBA"]);
        let mlb: Vec<_> = n.results.get("MLB").unwrap().iter().map(|r| r.versus.as_str()).collect();
        assert_eq!(mlb, vec!["BOS", "TB"]);
        assert_eq!(n.results.get("MLB").unwrap()[0].team, "NYY - P");
        assert_eq!(n.results.get("NBA").unwrap()[0].flash_sale_value, Some(1.0));
    }

    #[test]
    fn unresolvable_projection_becomes_gap() {
        let n = normalized();
        assert_eq!(n.summary.total_entries, 3);
        assert_eq!(n.summary.distinct_leagues, 2);
        assert_eq!(n.summary.gaps, 1);
        assert_eq!(
            n.gaps[0],
            ResolutionGap {
                projection_id: "d".into(),
                kind: GapKind::Player,
                missing_id: Some("ghost".into()),
            }
        );
        assert_eq!(n.results.total_records(), n.summary.total_entries);
    }

    #[test]
    fn snapshot_serializes_league_order_and_omits_timestamp() {
        let n = normalized();
        let json = serde_json::to_string(&n.results).unwrap();
        assert!(json.find("\"MLB\"").unwrap() < json.find("\"NBA\"").unwrap());
        assert!(json.contains("\"FlashSaleValue\":null"));
        assert!(!json.contains("LastUpdatedAt"));
    }
}
