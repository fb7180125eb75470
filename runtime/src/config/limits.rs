//! Caps, ceilings and timeouts for one crawl.
//!
//! Every component takes a `&CrawlLimits` instead of reading constants so
//! tests can run with tiny budgets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlLimits {
    // ── renderer ──
    pub navigation_timeout_ms: u64,
    pub click_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub scroll_pulses: u32,
    pub rescroll_pulses: u32,
    pub scroll_step_px: u32,
    pub clicks_per_selector: usize,

    // ── crawler ──
    /// Internal pages whose rendered text is not longer than this are dropped.
    pub internal_page_min_chars: usize,
    pub max_internal_pages: usize,

    // ── ranking & budgeting ──
    pub max_page_chars: usize,
    pub min_page_chars: usize,
    pub max_corpus_pages: usize,
    pub max_total_chars: usize,
    pub min_usable_pages: usize,

    // ── summarizer input ──
    pub summary_top_pages: usize,
    pub summary_max_chars: usize,

    // ── pricing ──
    pub price_pattern_cap: usize,
    pub from_price_pattern_cap: usize,
    pub max_raw_price_facts: usize,
    pub max_price_facts: usize,
    pub price_text_top: usize,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            click_timeout_ms: 1_200,
            settle_delay_ms: 350,
            scroll_pulses: 5,
            rescroll_pulses: 2,
            scroll_step_px: 1_600,
            clicks_per_selector: 25,

            internal_page_min_chars: 500,
            max_internal_pages: 25,

            max_page_chars: 20_000,
            min_page_chars: 200,
            max_corpus_pages: 30,
            max_total_chars: 280_000,
            min_usable_pages: 2,

            summary_top_pages: 22,
            summary_max_chars: 220_000,

            price_pattern_cap: 60,
            from_price_pattern_cap: 80,
            max_raw_price_facts: 200,
            max_price_facts: 160,
            price_text_top: 80,
        }
    }
}
