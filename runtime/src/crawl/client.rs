//! Client for a remote crawler service.
//!
//! The service is a collaborator: any non-success status or a body that is
//! not a successful crawl response is an upstream failure and fatal.

use super::service::{CrawlRequest, CrawlResponse};
use super::PageSource;
use crate::error::{DigestError, Result};
use crate::model::RawPage;
use async_trait::async_trait;
use std::time::Duration;

const SERVICE: &str = "crawler service";

/// Header carrying the shared crawler secret.
pub const TOKEN_HEADER: &str = "x-crawler-token";

#[derive(Clone)]
pub struct CrawlServiceClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl CrawlServiceClient {
    /// `timeout_ms` bounds the whole crawl round trip.
    pub fn new(endpoint: &str, token: &str, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("sitedigest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DigestError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl PageSource for CrawlServiceClient {
    async fn fetch_pages(&self, root_url: &str, max_pages: usize) -> Result<Vec<RawPage>> {
        let request = CrawlRequest {
            url: root_url.to_string(),
            max_pages: Some(max_pages),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header(TOKEN_HEADER, &self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| DigestError::upstream(SERVICE, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| DigestError::upstream(SERVICE, e))?;
        let parsed: Option<CrawlResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.error)
                .unwrap_or_else(|| status.to_string());
            return Err(DigestError::upstream(SERVICE, format!("{status}: {detail}")));
        }

        match parsed {
            Some(CrawlResponse {
                success: true,
                pages: Some(pages),
                ..
            }) => Ok(pages),
            Some(CrawlResponse {
                success: false,
                error,
                ..
            }) => Err(DigestError::upstream(
                SERVICE,
                error.unwrap_or_else(|| "crawl failed".to_string()),
            )),
            _ => Err(DigestError::upstream(SERVICE, "malformed crawl response")),
        }
    }
}
