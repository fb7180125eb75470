//! `sitedigest digest`: run the whole pipeline for one site.

use super::output;
use crate::config::{CrawlLimits, ServiceConfig};
use crate::crawl::{CrawlServiceClient, PageSource, SiteCrawler};
use crate::pipeline::DigestPipeline;
use crate::renderer::chromium::ChromiumLauncher;
use crate::store::{DigestRecord, SessionStore};
use crate::summarizer::HttpSummarizer;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Headroom per page on top of the navigation timeout, for scrolling and clicks.
const PER_PAGE_SLACK_MS: u64 = 30_000;

/// What the command prints: the digest without the full corpus text.
#[derive(Serialize)]
struct DigestSummary<'a> {
    session_id: &'a str,
    status: &'a str,
    language: Option<&'a str>,
    company_name: Option<&'a str>,
    pages: Vec<PageLine<'a>>,
    total_chars: usize,
    price_facts: usize,
    pricing_text: &'a str,
    summary: &'a str,
}

#[derive(Serialize)]
struct PageLine<'a> {
    url: &'a str,
    category: &'a str,
    chars: usize,
}

impl<'a> From<&'a DigestRecord> for DigestSummary<'a> {
    fn from(r: &'a DigestRecord) -> Self {
        Self {
            session_id: &r.session_id,
            status: r.status.as_str(),
            language: r.language.as_deref(),
            company_name: r.company_name.as_deref(),
            pages: r
                .corpus
                .pages
                .iter()
                .map(|p| PageLine {
                    url: &p.url,
                    category: p.category.as_str(),
                    chars: p.content.chars().count(),
                })
                .collect(),
            total_chars: r.corpus.total_chars,
            price_facts: r.pricing_facts.len(),
            pricing_text: &r.pricing_text,
            summary: &r.summary,
        }
    }
}

/// Upper bound for a remote crawl round trip.
pub fn remote_timeout_ms(limits: &CrawlLimits, max_pages: usize) -> u64 {
    (max_pages as u64 + 1) * (limits.navigation_timeout_ms + PER_PAGE_SLACK_MS)
}

pub async fn run(
    url: &str,
    session: Option<String>,
    local: bool,
    max_pages: Option<usize>,
) -> Result<()> {
    let config = ServiceConfig::from_env();
    let limits = CrawlLimits::default();
    let max_pages = max_pages.unwrap_or(limits.max_internal_pages);
    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let source: Arc<dyn PageSource> = if local {
        Arc::new(SiteCrawler::new(Arc::new(ChromiumLauncher), limits.clone()))
    } else {
        let (endpoint, token) = config.require_crawler()?;
        Arc::new(CrawlServiceClient::new(
            endpoint,
            token,
            remote_timeout_ms(&limits, max_pages),
        )?)
    };

    let store = SessionStore::open(&config.db_path)
        .with_context(|| format!("cannot open {}", config.db_path.display()))?;

    let mut pipeline = DigestPipeline::new(source, limits).with_store(Arc::new(store));
    match config.summarizer.clone() {
        Some(sc) => pipeline = pipeline.with_summarizer(Arc::new(HttpSummarizer::new(sc)?)),
        None => info!("SITEDIGEST_SUMMARIZER_KEY not set, skipping summarization"),
    }

    let record = pipeline.run(&session_id, url, max_pages).await?;
    output::print_json(&DigestSummary::from(&record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_timeout_covers_every_page() {
        let limits = CrawlLimits::default();
        assert_eq!(remote_timeout_ms(&limits, 0), 60_000);
        assert_eq!(remote_timeout_ms(&limits, 25), 26 * 60_000);
    }
}
