// src/sink/mod.rs
pub mod memory;
pub mod pacing;
pub mod sheets;
pub mod sync;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SinkError;

pub use memory::MemoryStore;
pub use pacing::PacingPolicy;
pub use sheets::{AccessTokenSource, ServiceAccountToken, SheetsStore};
pub use sync::{SyncReport, Synchronizer};

pub const HEADER_ROW: [&str; 8] = [
    "Player",
    "Team",
    "Versus",
    "Stat",
    "Value",
    "Flash Sale Value",
    "Game",
    "Last Updated At",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

/// A named-table store: one document, many sheets, each with a header row.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Authenticate and load document metadata.
    async fn connect(&self) -> Result<(), SinkError>;
    async fn has_table(&self, name: &str) -> Result<bool, SinkError>;
    async fn create_table(&self, name: &str) -> Result<(), SinkError>;
    /// Remove every row, header included.
    async fn clear_table(&self, name: &str) -> Result<(), SinkError>;
    async fn set_header_row(&self, name: &str, headers: &[&str]) -> Result<(), SinkError>;
    /// Append below the last existing row.
    async fn append_rows(&self, name: &str, rows: &[Vec<Cell>]) -> Result<(), SinkError>;
    fn name(&self) -> &'static str;
}
