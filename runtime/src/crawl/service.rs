//! Crawler-service boundary: the inbound `crawl` trigger.
//!
//! The shared secret is checked before any browser work starts, and only
//! one crawl runs at a time.

use super::PageSource;
use crate::error::DigestError;
use crate::model::RawPage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Body of a crawl request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

/// Wire shape of a crawl result: `{success, pages}` or `{success: false, error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<RawPage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl CrawlResponse {
    pub fn ok(pages: Vec<RawPage>) -> Self {
        Self {
            success: true,
            pages: Some(pages),
            error: None,
            code: None,
        }
    }

    pub fn failed(err: &DigestError) -> Self {
        Self {
            success: false,
            pages: None,
            error: Some(err.to_string()),
            code: Some(err.code().to_string()),
        }
    }
}

/// Serves crawl requests over any [`PageSource`].
pub struct CrawlService {
    source: Arc<dyn PageSource>,
    /// Shared secret; `None` leaves the service open.
    token: Option<String>,
    default_max_pages: usize,
    /// One crawl at a time: browsers are too heavy to run side by side.
    gate: Mutex<()>,
}

impl CrawlService {
    pub fn new(source: Arc<dyn PageSource>, token: Option<String>, default_max_pages: usize) -> Self {
        Self {
            source,
            token,
            default_max_pages,
            gate: Mutex::new(()),
        }
    }

    /// Check the caller's token against the configured secret.
    pub fn authorize(&self, supplied: Option<&str>) -> Result<(), DigestError> {
        match (&self.token, supplied) {
            (None, _) => Ok(()),
            (Some(expected), Some(given)) if constant_time_eq(expected, given) => Ok(()),
            (Some(_), Some(_)) => Err(DigestError::Unauthorized("invalid crawler token".into())),
            (Some(_), None) => Err(DigestError::Unauthorized("missing crawler token".into())),
        }
    }

    /// Handle one crawl request end to end.
    pub async fn crawl(&self, request: &CrawlRequest, token: Option<&str>) -> CrawlResponse {
        if let Err(e) = self.authorize(token) {
            warn!(url = %request.url, "rejected crawl request: {e}");
            return CrawlResponse::failed(&e);
        }

        let max_pages = request.max_pages.unwrap_or(self.default_max_pages);
        let _running = self.gate.lock().await;
        info!(url = %request.url, max_pages, "crawl request accepted");

        match self.source.fetch_pages(&request.url, max_pages).await {
            Ok(pages) => CrawlResponse::ok(pages),
            Err(e) => {
                warn!(url = %request.url, error = %e, "crawl request failed");
                CrawlResponse::failed(&e)
            }
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for CountingSource {
        async fn fetch_pages(&self, root_url: &str, max_pages: usize) -> Result<Vec<RawPage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if root_url.contains("down") {
                return Err(DigestError::Crawl {
                    url: root_url.into(),
                    reason: "timeout".into(),
                });
            }
            Ok(vec![RawPage {
                url: root_url.into(),
                title: format!("max={max_pages}"),
                text: "body".into(),
            }])
        }
    }

    fn service(token: Option<&str>) -> (Arc<CountingSource>, CrawlService) {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let svc = CrawlService::new(source.clone(), token.map(String::from), 7);
        (source, svc)
    }

    fn request(url: &str) -> CrawlRequest {
        CrawlRequest {
            url: url.into(),
            max_pages: None,
        }
    }

    #[tokio::test]
    async fn test_wrong_token_rejected_before_crawling() {
        let (source, svc) = service(Some("s3cret"));
        let resp = svc.crawl(&request("https://a.bg/"), Some("nope")).await;
        assert!(!resp.success);
        assert_eq!(resp.code.as_deref(), Some("E_UNAUTHORIZED"));
        let resp = svc.crawl(&request("https://a.bg/"), None).await;
        assert!(!resp.success);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_open_service_and_default_page_cap() {
        let (_, svc) = service(None);
        let resp = svc.crawl(&request("https://a.bg/"), None).await;
        assert!(resp.success);
        assert_eq!(resp.pages.unwrap()[0].title, "max=7");
    }

    #[tokio::test]
    async fn test_crawl_failure_becomes_failed_response() {
        let (_, svc) = service(Some("s3cret"));
        let resp = svc.crawl(&request("https://down.bg/"), Some("s3cret")).await;
        assert!(!resp.success);
        assert_eq!(resp.code.as_deref(), Some("E_CRAWL"));
        assert!(resp.error.unwrap().contains("timeout"));
    }

    #[test]
    fn test_failed_response_omits_pages() {
        let json = serde_json::to_value(CrawlResponse::failed(&DigestError::Unauthorized(
            "missing crawler token".into(),
        )))
        .unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("pages").is_none());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
