//! Page acquisition: link prioritization, the site crawler, and the
//! crawler-service boundary.

pub mod client;
pub mod crawler;
pub mod links;
pub mod service;

pub use client::CrawlServiceClient;
pub use crawler::SiteCrawler;
pub use links::prioritize_links;
pub use service::{CrawlRequest, CrawlResponse, CrawlService};

use crate::error::Result;
use crate::model::RawPage;
use async_trait::async_trait;

/// Something that can turn a root URL into a raw page corpus.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Root page first, then up to `max_pages` internal pages in visit order.
    async fn fetch_pages(&self, root_url: &str, max_pages: usize) -> Result<Vec<RawPage>>;
}
