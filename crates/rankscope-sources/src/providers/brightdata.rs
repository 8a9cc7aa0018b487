//! Bright Data request API providers (SERP and Web Unlocker zones).

use crate::adapter::{ContentProvider, SearchProvider};
use crate::error::Result;
use crate::html::{extract_content, parse_serp};
use crate::http::{build_client, error_for_transport, read_text};
use crate::payload::{ContentPayload, PayloadMeta, SearchPayload};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ZoneRequest<'a> {
    zone: &'a str,
    url: &'a str,
    format: &'static str,
}

/// Authenticated client for the Bright Data `request` endpoint.
#[derive(Clone)]
struct BrightDataClient {
    client: Client,
    endpoint: String,
    api_token: String,
}

impl BrightDataClient {
    fn new(endpoint: String, api_token: String, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint,
            api_token,
        })
    }

    /// Fetch `url` through `zone` and return the raw body.
    async fn fetch_raw(&self, zone: &str, url: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&ZoneRequest {
                zone,
                url,
                format: "raw",
            })
            .send()
            .await
            .map_err(|e| error_for_transport(&e))?;
        read_text(response).await
    }
}

/// Google organic results through a Bright Data SERP zone.
pub struct BrightDataSerpProvider {
    client: BrightDataClient,
    zone: String,
    search_engine_url: String,
}

impl BrightDataSerpProvider {
    /// Provider posting to `endpoint` with `api_token`, querying `search_engine_url` via `zone`.
    pub fn new(
        endpoint: impl Into<String>,
        api_token: impl Into<String>,
        zone: impl Into<String>,
        search_engine_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: BrightDataClient::new(endpoint.into(), api_token.into(), timeout_secs)?,
            zone: zone.into(),
            search_engine_url: search_engine_url.into(),
        })
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}?q={}",
            self.search_engine_url,
            urlencoding::encode(keyword)
        )
    }
}

#[async_trait]
impl SearchProvider for BrightDataSerpProvider {
    async fn search(&self, keyword: &str) -> Result<SearchPayload> {
        let search_url = self.search_url(keyword);
        tracing::debug!(keyword, zone = %self.zone, "Requesting search results");
        let html = self.client.fetch_raw(&self.zone, &search_url).await?;
        let entries = parse_serp(&html);
        tracing::debug!(keyword, results = entries.len(), "Parsed search results");

        Ok(SearchPayload {
            keyword: keyword.to_string(),
            entries,
            meta: PayloadMeta::new(self.source_id())
                .with_extra("searchUrl", serde_json::Value::String(search_url)),
        })
    }

    fn source_id(&self) -> &str {
        "brightdata-serp"
    }
}

/// Page content through a Bright Data Web Unlocker zone.
pub struct BrightDataUnlockerProvider {
    client: BrightDataClient,
    zone: String,
}

impl BrightDataUnlockerProvider {
    /// Provider posting to `endpoint` with `api_token` through `zone`.
    pub fn new(
        endpoint: impl Into<String>,
        api_token: impl Into<String>,
        zone: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: BrightDataClient::new(endpoint.into(), api_token.into(), timeout_secs)?,
            zone: zone.into(),
        })
    }
}

#[async_trait]
impl ContentProvider for BrightDataUnlockerProvider {
    async fn fetch(&self, url: &str) -> Result<ContentPayload> {
        tracing::debug!(url, zone = %self.zone, "Requesting page content");
        let html = self.client.fetch_raw(&self.zone, url).await?;
        let extracted = extract_content(&html);

        Ok(ContentPayload {
            url: url.to_string(),
            title: extracted.title,
            meta_description: extracted.meta_description,
            headings: extracted.headings,
            text: extracted.text,
            meta: PayloadMeta::new(self.source_id()).with_extra(
                "htmlBytes",
                serde_json::Value::from(html.len()),
            ),
        })
    }

    fn source_id(&self) -> &str {
        "brightdata-unlocker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_keyword() {
        let provider = BrightDataSerpProvider::new(
            "https://api.brightdata.com/request",
            "token",
            "serp_api1",
            "https://www.google.com/search",
            30,
        )
        .unwrap();
        assert_eq!(
            provider.search_url("running shoes & socks"),
            "https://www.google.com/search?q=running%20shoes%20%26%20socks"
        );
    }

    #[test]
    fn test_zone_request_body() {
        let body = serde_json::to_value(ZoneRequest {
            zone: "web_unlocker1",
            url: "https://example.com",
            format: "raw",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"zone": "web_unlocker1", "url": "https://example.com", "format": "raw"})
        );
    }
}
