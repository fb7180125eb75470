//! Auto-expand: reveal lazy and disclosure-hidden content, then extract.
//!
//! Every scroll pulse and every click is its own operation with its own
//! timeout and its own failure recovery. Only navigation and body-text
//! extraction can fail a page.

use super::{RenderContext, RenderedPage, Renderer};
use crate::config::{ContentRules, CrawlLimits};
use crate::error::{DigestError, Result};
use crate::text::normalize_visible;
use std::time::Duration;
use tracing::{debug, info};

/// Render one URL in its own tab. The tab is closed on every exit path.
pub async fn render_page(
    renderer: &dyn Renderer,
    url: &str,
    limits: &CrawlLimits,
    rules: &ContentRules,
) -> Result<RenderedPage> {
    let mut ctx = renderer
        .new_context()
        .await
        .map_err(|e| DigestError::render(url, format!("{e:#}")))?;

    let outcome = expand_and_extract(ctx.as_mut(), url, limits, rules).await;

    if let Err(e) = ctx.close().await {
        debug!(url = %url, error = %e, "tab close failed");
    }
    outcome
}

async fn expand_and_extract(
    ctx: &mut dyn RenderContext,
    url: &str,
    limits: &CrawlLimits,
    rules: &ContentRules,
) -> Result<RenderedPage> {
    let nav = ctx
        .navigate(url, limits.navigation_timeout_ms)
        .await
        .map_err(|e| DigestError::render(url, format!("{e:#}")))?;
    debug!(url = %url, load_ms = nav.load_time_ms, "DOM parsed");

    scroll_pulses(ctx, limits.scroll_pulses, limits).await;
    let clicked = click_expandables(ctx, limits, rules).await;
    scroll_pulses(ctx, limits.rescroll_pulses, limits).await;

    let title = ctx.title().await.unwrap_or_else(|e| {
        debug!(url = %url, error = %e, "title unavailable");
        String::new()
    });
    let body = ctx
        .body_text()
        .await
        .map_err(|e| DigestError::render(url, format!("text extraction failed: {e:#}")))?;
    let links = ctx.links().await.unwrap_or_else(|e| {
        debug!(url = %url, error = %e, "link extraction failed");
        Vec::new()
    });

    let text = normalize_visible(&body);
    info!(
        url = %url,
        chars = text.chars().count(),
        links = links.len(),
        clicked,
        "page rendered"
    );

    Ok(RenderedPage {
        url: url.to_string(),
        title: normalize_visible(&title),
        text,
        links,
    })
}

async fn scroll_pulses(ctx: &dyn RenderContext, pulses: u32, limits: &CrawlLimits) {
    let settle = Duration::from_millis(limits.settle_delay_ms);
    for _ in 0..pulses {
        if let Err(e) = ctx.scroll_by(limits.scroll_step_px).await {
            debug!(error = %e, "scroll pulse failed");
        }
        tokio::time::sleep(settle).await;
    }
}

/// Click up to `clicks_per_selector` matches of each expandable selector.
/// Returns how many clicks landed.
async fn click_expandables(
    ctx: &dyn RenderContext,
    limits: &CrawlLimits,
    rules: &ContentRules,
) -> usize {
    let timeout = Duration::from_millis(limits.click_timeout_ms);
    let mut clicked = 0;

    for selector in &rules.expandable_selectors {
        let matches = match tokio::time::timeout(timeout, ctx.count_matches(selector)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                log_interaction(selector, format!("{e:#}"));
                continue;
            }
            Err(_) => {
                log_interaction(selector, "lookup timed out");
                continue;
            }
        };

        for index in 0..matches.min(limits.clicks_per_selector) {
            match tokio::time::timeout(timeout, ctx.click_match(selector, index)).await {
                Ok(Ok(true)) => clicked += 1,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => log_interaction(selector, format!("{e:#}")),
                Err(_) => log_interaction(selector, "click timed out"),
            }
        }
    }

    clicked
}

fn log_interaction(selector: &str, message: impl Into<String>) {
    let err = DigestError::Interaction {
        selector: selector.to_string(),
        message: message.into(),
    };
    debug!(error = %err, "expand interaction skipped");
}
