//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (Chromium via chromiumoxide in production, an
//! in-memory fixture in tests). The auto-expand routine in [`expand`]
//! only talks to these traits.

pub mod chromium;
pub mod expand;
pub mod fixture;

pub use expand::render_page;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The URL the tab ended up on after redirects.
    pub final_url: String,
    /// Time until the DOM was parsed, in milliseconds.
    pub load_time_ms: u64,
}

/// What one rendered page yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub url: String,
    pub title: String,
    /// Visible body text, already through [`crate::text::normalize_visible`].
    pub text: String,
    /// `href` of every anchor, as the browser resolved it.
    pub links: Vec<String>,
}

/// Starts a browser for one crawl. The crawler shuts the returned renderer
/// down when the crawl ends, whatever the outcome.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Renderer>>;
}

/// A browser engine that can open tabs.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a new tab in the shared browser context.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently open tabs.
    fn active_contexts(&self) -> usize;
}

/// A single browser tab.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate and wait until the DOM is parsed (not network idle).
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Scroll the viewport down by `pixels`.
    async fn scroll_by(&self, pixels: u32) -> Result<()>;
    /// Count elements currently matching a CSS selector.
    async fn count_matches(&self, selector: &str) -> Result<usize>;
    /// Click the `index`-th match of `selector`. `Ok(false)` if it is gone.
    async fn click_match(&self, selector: &str, index: usize) -> Result<bool>;
    /// Document title.
    async fn title(&self) -> Result<String>;
    /// Visible text of the document body.
    async fn body_text(&self) -> Result<String>;
    /// `href` of every anchor element.
    async fn links(&self) -> Result<Vec<String>>;
    /// Close this tab.
    async fn close(self: Box<Self>) -> Result<()>;
}
