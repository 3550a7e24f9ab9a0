// src/sink/sheets.rs
use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{Cell, TableStore};
use crate::error::{SinkError, SinkOp};

const DEFAULT_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Hands out a bearer token for each API call. Implementations own caching
/// and refresh; callers never hold a token across calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, SinkError>;
}

/// OAuth tokens minted from a service-account key file. `gcp_auth` caches the
/// token and refreshes it shortly before expiry.
pub struct ServiceAccountToken {
    account: CustomServiceAccount,
}

impl ServiceAccountToken {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let account = CustomServiceAccount::from_file(path)
            .map_err(|e| SinkError::Auth(format!("service account {}: {e}", path.display())))?;
        Ok(Self { account })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountToken {
    async fn access_token(&self) -> Result<String, SinkError> {
        let token = self
            .account
            .token(&[SHEETS_SCOPE])
            .await
            .map_err(|e| SinkError::Auth(format!("token exchange: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// Google Sheets v4 REST adapter. One spreadsheet; one sheet per league.
pub struct SheetsStore {
    client: Client,
    base: String,
    spreadsheet_id: String,
    tokens: Arc<dyn AccessTokenSource>,
    titles: Mutex<HashSet<String>>,
}

impl SheetsStore {
    pub fn new(spreadsheet_id: impl Into<String>, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client: Client::new(),
            base: DEFAULT_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
            titles: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_service_account(
        spreadsheet_id: &str,
        credentials: impl AsRef<Path>,
    ) -> Result<Self, SinkError> {
        let tokens = ServiceAccountToken::from_file(credentials)?;
        Ok(Self::new(spreadsheet_id.trim(), Arc::new(tokens)))
    }

    async fn bearer(&self) -> Result<String, SinkError> {
        self.tokens.access_token().await
    }

    fn url(&self, league: &str, op: SinkOp, segments: &[&str]) -> Result<Url, SinkError> {
        let mut url = Url::parse(&self.base).map_err(|e| write_err(league, op, e))?;
        url.path_segments_mut()
            .map_err(|_| write_err(league, op, "base url cannot have a path"))?
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, league: &str, op: SinkOp, suffix: &str) -> Result<Url, SinkError> {
        let range = format!("{}{}", a1_range(league), suffix);
        self.url(league, op, &[&self.spreadsheet_id, "values", &range])
    }

    async fn send(
        &self,
        league: &str,
        op: SinkOp,
        req: RequestBuilder,
    ) -> Result<reqwest::Response, SinkError> {
        let token = self.bearer().await?;
        let rsp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| write_err(league, op, e))?;
        match rsp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SinkError::Auth(format!("HTTP {}", rsp.status())))
            }
            s if !s.is_success() => {
                let body = rsp.text().await.unwrap_or_default();
                Err(write_err(league, op, format!("HTTP {s}: {body}")))
            }
            _ => Ok(rsp),
        }
    }

    fn known(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.titles.lock().expect("sheet title cache poisoned")
    }
}

#[async_trait]
impl TableStore for SheetsStore {
    async fn connect(&self) -> Result<(), SinkError> {
        let mut url = self
            .url("*", SinkOp::Connect, &[&self.spreadsheet_id])
            .map_err(|e| SinkError::Auth(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let meta: SpreadsheetMeta = self
            .send("*", SinkOp::Connect, self.client.get(url))
            .await
            .map_err(|e| match e {
                SinkError::Auth(_) => e,
                other => SinkError::Auth(other.to_string()),
            })?
            .json()
            .await
            .map_err(|e| SinkError::Auth(format!("spreadsheet metadata: {e}")))?;

        let mut known = self.known();
        known.clear();
        known.extend(meta.sheets.into_iter().map(|s| s.properties.title));
        tracing::debug!(sheets = known.len(), "spreadsheet metadata loaded");
        Ok(())
    }

    async fn has_table(&self, name: &str) -> Result<bool, SinkError> {
        Ok(self.known().contains(name))
    }

    async fn create_table(&self, name: &str) -> Result<(), SinkError> {
        let url = self.url(
            name,
            SinkOp::Create,
            &[&format!("{}:batchUpdate", self.spreadsheet_id)],
        )?;
        let body = serde_json::json!({
            "requests": [{ "addSheet": { "properties": { "title": name } } }]
        });
        self.send(name, SinkOp::Create, self.client.post(url).json(&body))
            .await?;
        self.known().insert(name.to_string());
        Ok(())
    }

    async fn clear_table(&self, name: &str) -> Result<(), SinkError> {
        let url = self.values_url(name, SinkOp::Clear, ":clear")?;
        self.send(
            name,
            SinkOp::Clear,
            self.client.post(url).json(&serde_json::json!({})),
        )
        .await?;
        Ok(())
    }

    async fn set_header_row(&self, name: &str, headers: &[&str]) -> Result<(), SinkError> {
        let mut url = self.values_url(name, SinkOp::Header, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = serde_json::json!({ "values": [headers] });
        self.send(name, SinkOp::Header, self.client.put(url).json(&body))
            .await?;
        Ok(())
    }

    async fn append_rows(&self, name: &str, rows: &[Vec<Cell>]) -> Result<(), SinkError> {
        let mut url = self.values_url(name, SinkOp::Append, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = serde_json::json!({ "values": rows });
        self.send(name, SinkOp::Append, self.client.post(url).json(&body))
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "google-sheets"
    }
}

/// Whole-sheet A1 range: `'Title'`, with embedded quotes doubled.
pub fn a1_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn write_err(league: &str, op: SinkOp, e: impl std::fmt::Display) -> SinkError {
    SinkError::Write {
        league: league.to_string(),
        op,
        message: e.to_string(),
    }
}
