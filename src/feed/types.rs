// src/feed/types.rs
use serde::{Deserialize, Deserializer, Serialize};

/// The fetched relational document, as delivered. Both sections are
/// required; a challenge page or error object is not a feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeed {
    pub data: Vec<ProjectionEntry>,
    pub included: Vec<IncludedEntry>,
}

impl RawFeed {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectionEntry {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub attributes: ProjectionAttributes,
    #[serde(default)]
    pub relationships: Relationships,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectionAttributes {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub line_score: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub flash_sale_line_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default)]
    pub league: Option<RelRef>,
    #[serde(default, alias = "player")]
    pub new_player: Option<RelRef>,
    #[serde(default)]
    pub stat_type: Option<RelRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelRef {
    #[serde(default)]
    pub data: Option<RelData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelData {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
}

impl Relationships {
    pub fn league_id(&self) -> Option<&str> {
        ref_id(&self.league)
    }

    pub fn player_id(&self) -> Option<&str> {
        ref_id(&self.new_player)
    }

    pub fn stat_type_id(&self) -> Option<&str> {
        ref_id(&self.stat_type)
    }
}

fn ref_id(r: &Option<RelRef>) -> Option<&str> {
    r.as_ref()
        .and_then(|r| r.data.as_ref())
        .map(|d| d.id.as_str())
}

/// One entry of `included`; attributes stay untyped until resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludedEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

/// Ids show up both as `"123"` and `123`.
pub(crate) fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        S(String),
        N(serde_json::Number),
    }
    Ok(match Id::deserialize(d)? {
        Id::S(s) => s,
        Id::N(n) => n.to_string(),
    })
}

fn de_opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Num {
        F(f64),
        S(String),
    }
    Ok(match Option::<Num>::deserialize(d)? {
        Some(Num::F(f)) => Some(f),
        Some(Num::S(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}
