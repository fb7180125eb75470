//! `sitedigest crawl`: render a site locally and dump the raw pages.

use super::output;
use crate::config::CrawlLimits;
use crate::crawl::SiteCrawler;
use crate::renderer::chromium::ChromiumLauncher;
use anyhow::{Context, Result};
use std::sync::Arc;

pub async fn run(url: &str, max_pages: Option<usize>) -> Result<()> {
    let limits = CrawlLimits::default();
    let max_pages = max_pages.unwrap_or(limits.max_internal_pages);
    let crawler = SiteCrawler::new(Arc::new(ChromiumLauncher), limits);

    let pages = crawler
        .crawl(url, max_pages)
        .await
        .with_context(|| format!("crawl of {url} failed"))?;

    output::print_json(&pages)
}
