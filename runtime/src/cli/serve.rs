//! `sitedigest serve`: run the crawler service.

use crate::config::{CrawlLimits, ServiceConfig};
use crate::crawl::{CrawlService, SiteCrawler};
use crate::renderer::chromium::{find_chromium, ChromiumLauncher};
use crate::rest::{self, ServiceState};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(host: &str, port: u16, max_pages: Option<usize>) -> Result<()> {
    let config = ServiceConfig::from_env();
    let limits = CrawlLimits::default();

    match find_chromium() {
        Some(path) => info!(chromium = %path.display(), "browser found"),
        None => warn!("no Chromium found; crawls will fail until SITEDIGEST_CHROMIUM_PATH is set"),
    }
    if config.crawler_token.is_none() {
        warn!("SITEDIGEST_CRAWLER_TOKEN is not set, /crawl accepts unauthenticated requests");
    }

    let default_max = max_pages.unwrap_or(limits.max_internal_pages);
    let crawler = SiteCrawler::new(Arc::new(ChromiumLauncher), limits);
    let service = CrawlService::new(Arc::new(crawler), config.crawler_token, default_max);

    info!("starting sitedigest v{}", env!("CARGO_PKG_VERSION"));
    rest::start(host, port, Arc::new(ServiceState::new(service))).await
}
