//! Chromium-based renderer using chromiumoxide.

use super::{BrowserLauncher, NavigationResult, RenderContext, Renderer};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Interval between `document.readyState` polls while waiting for the DOM.
const DOM_POLL_INTERVAL: Duration = Duration::from_millis(100);

const DOM_READY_JS: &str =
    "document.readyState !== 'loading' && window.location.href !== 'about:blank'";

const BODY_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

const LINKS_JS: &str = "Array.from(document.querySelectorAll('a[href]')).map(a => a.href)";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. SITEDIGEST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SITEDIGEST_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.sitedigest/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".sitedigest/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".sitedigest/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".sitedigest/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".sitedigest/chromium/chrome-linux64/chrome"),
                home.join(".sitedigest/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches a fresh headless Chromium per crawl.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn Renderer>> {
        Ok(Arc::new(ChromiumRenderer::launch().await?))
    }
}

/// Headless Chromium. One instance backs one crawl; every page gets its own tab
/// inside the same browser context so cookies carry across pages.
pub struct ChromiumRenderer {
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn launch() -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Install Chrome or set SITEDIGEST_CHROMIUM_PATH.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--mute-audio")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Drive the CDP connection until the browser goes away.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::debug!("chromium handler event error");
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let guard = self.browser.lock().await;
        let Some(browser) = guard.as_ref() else {
            bail!("browser already shut down");
        };
        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        drop(guard);

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            let closed = browser.close().await;
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "chromium process wait failed");
            }
            self.handler.abort();
            closed.context("failed to close Chromium")?;
        }
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium tab.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;
        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn wait_for_dom(&self) {
        loop {
            // Evaluation fails while the old document is being torn down.
            if let Ok(true) = self.eval::<bool>(DOM_READY_JS).await {
                return;
            }
            tokio::time::sleep(DOM_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();
        let budget = Duration::from_millis(timeout_ms);

        let result = tokio::time::timeout(budget, self.page.execute(NavigateParams::new(url))).await;
        match result {
            Ok(Ok(response)) => {
                if let Some(err) = response.result.error_text.as_deref() {
                    bail!("navigation failed: {err}");
                }
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }

        let remaining = budget.saturating_sub(start.elapsed());
        if tokio::time::timeout(remaining, self.wait_for_dom()).await.is_err() {
            bail!("DOM not parsed after {timeout_ms}ms");
        }

        let final_url = self
            .page
            .url()
            .await
            .unwrap_or_default()
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn scroll_by(&self, pixels: u32) -> Result<()> {
        self.eval::<serde_json::Value>(&format!("window.scrollBy(0, {pixels}); true"))
            .await
            .map(|_| ())
    }

    async fn count_matches(&self, selector: &str) -> Result<usize> {
        let sel = serde_json::to_string(selector)?;
        self.eval(&format!("document.querySelectorAll({sel}).length"))
            .await
    }

    async fn click_match(&self, selector: &str, index: usize) -> Result<bool> {
        let sel = serde_json::to_string(selector)?;
        let script = format!(
            "(() => {{ const el = document.querySelectorAll({sel})[{index}]; \
             if (!el || !el.isConnected) return false; el.click(); return true; }})()"
        );
        self.eval(&script).await
    }

    async fn title(&self) -> Result<String> {
        self.eval("document.title").await
    }

    async fn body_text(&self) -> Result<String> {
        self.eval(BODY_TEXT_JS).await
    }

    async fn links(&self) -> Result<Vec<String>> {
        self.eval(LINKS_JS).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.page.close().await.context("failed to close tab")?;
        Ok(())
    }
}
