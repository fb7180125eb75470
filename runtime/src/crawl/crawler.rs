//! Site crawler: root page plus prioritized internal pages, one at a time.

use super::links::prioritize_links;
use super::PageSource;
use crate::config::{ContentRules, CrawlLimits};
use crate::error::{DigestError, Result};
use crate::model::RawPage;
use crate::renderer::{render_page, BrowserLauncher, RenderedPage, Renderer};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives the renderer across a site. Pages are fetched sequentially so only
/// one tab is in flight at any time.
pub struct SiteCrawler {
    launcher: Arc<dyn BrowserLauncher>,
    limits: CrawlLimits,
    rules: &'static ContentRules,
}

impl SiteCrawler {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, limits: CrawlLimits) -> Self {
        Self {
            launcher,
            limits,
            rules: ContentRules::builtin(),
        }
    }

    pub fn with_rules(mut self, rules: &'static ContentRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn limits(&self) -> &CrawlLimits {
        &self.limits
    }

    /// Crawl `root_url` and up to `max_pages` internal pages.
    ///
    /// A browser is launched for this crawl and shut down before returning,
    /// on success and on failure alike.
    pub async fn crawl(&self, root_url: &str, max_pages: usize) -> Result<Vec<RawPage>> {
        let renderer = self.launcher.launch().await.map_err(|e| DigestError::Crawl {
            url: root_url.to_string(),
            reason: format!("browser launch failed: {e:#}"),
        })?;

        let result = self.crawl_with(renderer.as_ref(), root_url, max_pages).await;

        if let Err(e) = renderer.shutdown().await {
            warn!(error = %e, "browser shutdown failed");
        }
        result
    }

    async fn crawl_with(
        &self,
        renderer: &dyn Renderer,
        root_url: &str,
        max_pages: usize,
    ) -> Result<Vec<RawPage>> {
        let start = Instant::now();
        let max_pages = max_pages.min(self.limits.max_internal_pages);
        info!(url = %root_url, max_pages, "crawl started");

        let root = render_page(renderer, root_url, &self.limits, self.rules)
            .await
            .map_err(|e| DigestError::Crawl {
                url: root_url.to_string(),
                reason: e.to_string(),
            })?;

        let candidates = prioritize_links(root_url, &root.links, max_pages, self.rules);
        debug!(candidates = candidates.len(), "internal pages selected");

        let mut pages = vec![into_raw(root)];
        for link in &candidates {
            match render_page(renderer, link, &self.limits, self.rules).await {
                Ok(page) => {
                    let chars = page.text.chars().count();
                    if chars > self.limits.internal_page_min_chars {
                        pages.push(into_raw(page));
                    } else {
                        debug!(url = %link, chars, "internal page below length floor, skipped");
                    }
                }
                Err(e) => warn!(url = %link, error = %e, "internal page skipped"),
            }
        }

        info!(
            url = %root_url,
            pages = pages.len(),
            attempted = candidates.len() + 1,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "crawl finished"
        );
        Ok(pages)
    }
}

fn into_raw(page: RenderedPage) -> RawPage {
    RawPage {
        url: page.url,
        title: page.title,
        text: page.text,
    }
}

#[async_trait]
impl PageSource for SiteCrawler {
    async fn fetch_pages(&self, root_url: &str, max_pages: usize) -> Result<Vec<RawPage>> {
        self.crawl(root_url, max_pages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::fixture::{FixturePage, FixtureRenderer};

    fn long_text(seed: &str) -> String {
        (0..40)
            .map(|i| format!("{seed} line {i} with enough words to count"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn limits() -> CrawlLimits {
        CrawlLimits {
            click_timeout_ms: 20,
            settle_delay_ms: 0,
            ..CrawlLimits::default()
        }
    }

    fn crawler(renderer: &FixtureRenderer) -> SiteCrawler {
        SiteCrawler::new(Arc::new(renderer.clone()), limits())
    }

    #[tokio::test]
    async fn test_crawls_root_then_internal_pages_in_link_order() {
        let renderer = FixtureRenderer::builder()
            .page(
                "https://spa.bg/",
                FixturePage::new("Spa", "Home").with_links(&[
                    "https://spa.bg/uslugi",
                    "https://spa.bg/gallery",
                    "https://spa.bg/ceni",
                ]),
            )
            .page("https://spa.bg/uslugi", FixturePage::new("Услуги", &long_text("massage")))
            .page("https://spa.bg/ceni", FixturePage::new("Цени", &long_text("price")))
            .build();

        let pages = crawler(&renderer).crawl("https://spa.bg/", 10).await.unwrap();

        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://spa.bg/", "https://spa.bg/uslugi", "https://spa.bg/ceni"]);
        assert_eq!(
            renderer.visits(),
            vec!["https://spa.bg/", "https://spa.bg/uslugi", "https://spa.bg/ceni"]
        );
        assert_eq!(renderer.opened_tabs(), renderer.closed_tabs());
        assert_eq!(renderer.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_root_failure_is_fatal_and_browser_released() {
        let renderer = FixtureRenderer::builder().failing("https://spa.bg/").build();

        let err = crawler(&renderer).crawl("https://spa.bg/", 5).await.unwrap_err();

        assert_eq!(err.code(), "E_CRAWL");
        assert_eq!(renderer.shutdowns(), 1);
        assert_eq!(renderer.closed_tabs(), 1);
    }

    #[tokio::test]
    async fn test_internal_failures_and_stubs_are_skipped() {
        let renderer = FixtureRenderer::builder()
            .page(
                "https://spa.bg/",
                FixturePage::new("Spa", "Short root").with_links(&[
                    "https://spa.bg/za-nas",
                    "https://spa.bg/kontakti",
                    "https://spa.bg/ceni",
                ]),
            )
            .failing("https://spa.bg/za-nas")
            .page("https://spa.bg/kontakti", FixturePage::new("Контакти", "tel: 0888"))
            .page("https://spa.bg/ceni", FixturePage::new("Цени", &long_text("price")))
            .build();

        let pages = crawler(&renderer).crawl("https://spa.bg/", 10).await.unwrap();

        // Root is kept even though it is short; the stub contact page is not.
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://spa.bg/", "https://spa.bg/ceni"]);
        assert_eq!(renderer.visits().len(), 4);
    }

    #[tokio::test]
    async fn test_all_internal_pages_fail_still_returns_root() {
        let renderer = FixtureRenderer::builder()
            .page(
                "https://spa.bg/",
                FixturePage::new("Spa", &long_text("home"))
                    .with_links(&["https://spa.bg/ceni", "https://spa.bg/uslugi"]),
            )
            .failing("https://spa.bg/ceni")
            .failing("https://spa.bg/uslugi")
            .build();

        let pages = crawler(&renderer).crawl("https://spa.bg/", 10).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://spa.bg/");
    }

    #[tokio::test]
    async fn test_max_pages_caps_internal_visits() {
        let renderer = FixtureRenderer::builder()
            .page(
                "https://spa.bg/",
                FixturePage::new("Spa", "Home").with_links(&[
                    "https://spa.bg/ceni",
                    "https://spa.bg/uslugi",
                    "https://spa.bg/kontakti",
                ]),
            )
            .page("https://spa.bg/ceni", FixturePage::new("Цени", &long_text("a")))
            .page("https://spa.bg/uslugi", FixturePage::new("Услуги", &long_text("b")))
            .page("https://spa.bg/kontakti", FixturePage::new("Контакти", &long_text("c")))
            .build();

        let pages = crawler(&renderer).crawl("https://spa.bg/", 1).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(renderer.visits().len(), 2);
    }
}
