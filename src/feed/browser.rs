// src/feed/browser.rs
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;

use crate::error::AcquisitionError;

/// Something that can open a page-fetching session against the feed endpoint.
#[async_trait]
pub trait FeedBrowser: Send + Sync {
    async fn open(&self) -> Result<Box<dyn FeedSession>, AcquisitionError>;
    fn name(&self) -> &'static str;
}

/// One live session. `close` must be called once the caller is done with it.
#[async_trait]
pub trait FeedSession: Send {
    /// Navigate to `url` and return the JSON text the page carries.
    async fn fetch_document(&mut self, url: &str) -> Result<String, AcquisitionError>;
    async fn close(self: Box<Self>);
}

/// Browser-imitating HTTP client: desktop user agent plus the headers a
/// real navigation sends.
#[derive(Clone)]
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    pub fn new(user_agent: &str) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedBrowser for HttpBrowser {
    async fn open(&self) -> Result<Box<dyn FeedSession>, AcquisitionError> {
        tracing::debug!(browser = self.name(), "session opened");
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

struct HttpSession {
    client: Client,
}

#[async_trait]
impl FeedSession for HttpSession {
    async fn fetch_document(&mut self, url: &str) -> Result<String, AcquisitionError> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AcquisitionError::Fetch(e.to_string()))?
            .text()
            .await
            .map_err(|e| AcquisitionError::Fetch(e.to_string()))?;
        Ok(extract_payload(&body))
    }

    async fn close(self: Box<Self>) {
        tracing::debug!("session closed");
    }
}

/// Browsers render bare JSON inside `<pre>`; unwrap it when that is what came back.
pub fn extract_payload(body: &str) -> String {
    if !body.trim_start().starts_with('<') {
        return body.to_string();
    }
    static RE_PRE: OnceCell<Regex> = OnceCell::new();
    let re_pre = RE_PRE.get_or_init(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").unwrap());
    match re_pre.captures(body) {
        Some(c) => html_escape::decode_html_entities(&c[1]).into_owned(),
        None => body.to_string(),
    }
}
