//! In-memory renderer serving canned pages.
//!
//! Lets the crawler and pipeline run end to end without a browser: pages
//! can hide text behind a selector, fail to load, or have clicks that hang.

use super::{BrowserLauncher, NavigationResult, RenderContext, Renderer};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A canned page.
#[derive(Debug, Clone, Default)]
pub struct FixturePage {
    pub title: String,
    pub text: String,
    pub links: Vec<String>,
    /// Text appended to the body once an element matching the selector is clicked.
    pub hidden: Vec<(String, String)>,
    /// Text appended once the page has been scrolled this many times.
    pub lazy: Option<(u32, String)>,
}

impl FixturePage {
    pub fn new(title: &str, text: &str) -> Self {
        Self {
            title: title.to_string(),
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_hidden(mut self, selector: &str, text: &str) -> Self {
        self.hidden.push((selector.to_string(), text.to_string()));
        self
    }

    pub fn with_lazy(mut self, after_scrolls: u32, text: &str) -> Self {
        self.lazy = Some((after_scrolls, text.to_string()));
        self
    }
}

#[derive(Default)]
struct FixtureState {
    pages: HashMap<String, FixturePage>,
    failing: HashSet<String>,
    hanging_selectors: HashSet<String>,
    broken_selectors: HashSet<String>,
    visits: Mutex<Vec<String>>,
    clicks: Mutex<Vec<(String, usize)>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    shutdowns: AtomicUsize,
}

/// Renderer backed by a fixed set of pages keyed by URL.
#[derive(Clone, Default)]
pub struct FixtureRenderer {
    state: Arc<FixtureState>,
}

impl FixtureRenderer {
    pub fn builder() -> FixtureRendererBuilder {
        FixtureRendererBuilder::default()
    }

    /// URLs navigated to, in order.
    pub fn visits(&self) -> Vec<String> {
        self.state.visits.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// `(selector, index)` of every click that went through.
    pub fn clicks(&self) -> Vec<(String, usize)> {
        self.state.clicks.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn opened_tabs(&self) -> usize {
        self.state.opened.load(Ordering::Relaxed)
    }

    pub fn closed_tabs(&self) -> usize {
        self.state.closed.load(Ordering::Relaxed)
    }

    pub fn shutdowns(&self) -> usize {
        self.state.shutdowns.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct FixtureRendererBuilder {
    state: FixtureState,
}

impl FixtureRendererBuilder {
    pub fn page(mut self, url: &str, page: FixturePage) -> Self {
        self.state.pages.insert(url.to_string(), page);
        self
    }

    /// Navigation to this URL fails.
    pub fn failing(mut self, url: &str) -> Self {
        self.state.failing.insert(url.to_string());
        self
    }

    /// Clicks on this selector never complete.
    pub fn hanging(mut self, selector: &str) -> Self {
        self.state.hanging_selectors.insert(selector.to_string());
        self
    }

    /// Clicks on this selector return an error.
    pub fn broken(mut self, selector: &str) -> Self {
        self.state.broken_selectors.insert(selector.to_string());
        self
    }

    pub fn build(self) -> FixtureRenderer {
        FixtureRenderer {
            state: Arc::new(self.state),
        }
    }
}

/// Hands out the same fixture for every crawl, so counters accumulate.
#[async_trait]
impl BrowserLauncher for FixtureRenderer {
    async fn launch(&self) -> Result<Arc<dyn Renderer>> {
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Renderer for FixtureRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.state.opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(FixtureContext {
            state: Arc::clone(&self.state),
            current: None,
            scrolls: Mutex::new(0),
            revealed: Mutex::new(Vec::new()),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.shutdowns.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.opened_tabs().saturating_sub(self.closed_tabs())
    }
}

struct FixtureContext {
    state: Arc<FixtureState>,
    current: Option<String>,
    scrolls: Mutex<u32>,
    revealed: Mutex<Vec<String>>,
}

impl FixtureContext {
    fn page(&self) -> Result<&FixturePage> {
        let url = self.current.as_ref().ok_or_else(|| anyhow!("no page loaded"))?;
        self.state
            .pages
            .get(url)
            .ok_or_else(|| anyhow!("no fixture for {url}"))
    }
}

#[async_trait]
impl RenderContext for FixtureContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        if let Ok(mut visits) = self.state.visits.lock() {
            visits.push(url.to_string());
        }
        if self.state.failing.contains(url) {
            bail!("navigation timed out after {timeout_ms}ms");
        }
        if !self.state.pages.contains_key(url) {
            bail!("net::ERR_NAME_NOT_RESOLVED");
        }
        self.current = Some(url.to_string());
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn scroll_by(&self, _pixels: u32) -> Result<()> {
        if let Ok(mut n) = self.scrolls.lock() {
            *n += 1;
        }
        Ok(())
    }

    async fn count_matches(&self, selector: &str) -> Result<usize> {
        let page = self.page()?;
        let hidden = page.hidden.iter().filter(|(s, _)| s == selector).count();
        let special = self.state.hanging_selectors.contains(selector)
            || self.state.broken_selectors.contains(selector);
        Ok(if special { hidden.max(3) } else { hidden })
    }

    async fn click_match(&self, selector: &str, index: usize) -> Result<bool> {
        if self.state.hanging_selectors.contains(selector) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.state.broken_selectors.contains(selector) {
            bail!("element is detached from document");
        }
        let page = self.page()?;
        let Some((_, text)) = page
            .hidden
            .iter()
            .filter(|(s, _)| s == selector)
            .nth(index)
        else {
            return Ok(false);
        };
        if let Ok(mut clicks) = self.state.clicks.lock() {
            clicks.push((selector.to_string(), index));
        }
        if let Ok(mut revealed) = self.revealed.lock() {
            revealed.push(text.clone());
        }
        Ok(true)
    }

    async fn title(&self) -> Result<String> {
        Ok(self.page()?.title.clone())
    }

    async fn body_text(&self) -> Result<String> {
        let page = self.page()?;
        let mut text = page.text.clone();
        if let Ok(revealed) = self.revealed.lock() {
            for extra in revealed.iter() {
                text.push('\n');
                text.push_str(extra);
            }
        }
        let scrolls = self.scrolls.lock().map(|n| *n).unwrap_or(0);
        if let Some((needed, extra)) = &page.lazy {
            if scrolls >= *needed {
                text.push('\n');
                text.push_str(extra);
            }
        }
        Ok(text)
    }

    async fn links(&self) -> Result<Vec<String>> {
        Ok(self.page()?.links.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.closed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
