// src/feed/catalog.rs
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::CatalogError;
use crate::feed::types::de_id;

#[derive(Debug, Deserialize)]
struct CatalogDoc {
    #[serde(default)]
    data: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(deserialize_with = "de_id")]
    id: String,
    attributes: CatalogAttributes,
}

#[derive(Debug, Deserialize)]
struct CatalogAttributes {
    name: String,
}

/// League id → display name. Read-only for the duration of a cycle.
#[derive(Debug, Clone, Default)]
pub struct LeagueCatalog {
    names: HashMap<String, String>,
}

impl LeagueCatalog {
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&content)
    }

    pub fn from_json(s: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDoc = serde_json::from_str(s)?;
        let mut names = HashMap::with_capacity(doc.data.len());
        for entry in doc.data {
            if let Some(prev) = names.insert(entry.id.clone(), entry.attributes.name) {
                tracing::warn!(league_id = %entry.id, previous = %prev, "duplicate league id in catalog");
            }
        }
        Ok(Self { names })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn name(&self, league_id: &str) -> Option<&str> {
        self.names.get(league_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_parses_and_last_duplicate_wins() {
        let cat = LeagueCatalog::from_json(
            r#"{"data":[
                {"id":"7","attributes":{"name":"NBA"}},
                {"id":2,"attributes":{"name":"MLB"}},
                {"id":"7","attributes":{"name":"NBA2"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.name("2"), Some("MLB"));
        assert_eq!(cat.name("7"), Some("NBA2"));
        assert_eq!(cat.name("99"), None);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = LeagueCatalog::load(Path::new("definitely/not/here.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[tokio::test]
    async fn load_reads_catalog_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("league.json");
        tokio::fs::write(&path, r#"{"data":[{"id":"9","attributes":{"name":"NFL"}}]}"#)
            .await
            .unwrap();
        let cat = LeagueCatalog::load(&path).await.unwrap();
        assert_eq!(cat.name("9"), Some("NFL"));
    }
}
