//! Pricing extractor: structured price facts from unstructured page text.
//!
//! Two layered patterns run over pages that mention prices at all:
//!
//! 1. an amount directly followed by a currency token, labelled with the
//!    text around it;
//! 2. the "<room/package/stay> ... от <amount> <currency>" idiom, labelled
//!    with the whole phrase.
//!
//! Facts are collected across pages up to a raw ceiling, then deduplicated
//! by `(label lowercased, amount, currency)` with the first occurrence kept.

use crate::config::{ContentRules, CrawlLimits};
use crate::model::{Corpus, Currency, PriceFact};
use crate::text::truncate_chars;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

/// Characters of context kept on each side of a currency match.
const CONTEXT_CHARS: usize = 55;

fn currency_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b([0-9]{1,7}(?:[.,][0-9]{1,2})?)\s*(лв\.?|лева|евро|euro?\b|€)")
            .expect("currency regex is valid")
    })
}

fn from_price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:пакет\w*|нощувк[аи]|стая|стаи|апартамент\w*|студио|престой|почивка|package|room|stay)[^\n]{0,80}?\bот\s*([0-9]{1,7}(?:[.,][0-9]{1,2})?)\s*(лв\.?|лева|евро|euro?\b|€)",
        )
        .expect("from-price regex is valid")
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

/// Deduplicated facts plus the plain-text rendering handed to the summarizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingSummary {
    pub facts: Vec<PriceFact>,
    pub text: String,
}

/// Whether the page mentions anything price-like at all.
pub fn has_price_indicator(content: &str, rules: &ContentRules) -> bool {
    let lower = content.to_lowercase();
    rules
        .price_indicators
        .iter()
        .any(|k| lower.contains(k.as_str()))
}

/// Extract price facts from one page.
pub fn extract_page(
    content: &str,
    url: &str,
    title: &str,
    limits: &CrawlLimits,
    rules: &ContentRules,
) -> Vec<PriceFact> {
    if !has_price_indicator(content, rules) {
        return Vec::new();
    }

    let fact = |label: String, caps: &Captures<'_>| -> Option<PriceFact> {
        let currency = Currency::from_token(caps.get(2)?.as_str())?;
        Some(PriceFact {
            label,
            amount: caps.get(1)?.as_str().replace('.', ","),
            currency,
            source_url: url.to_string(),
            source_title: title.to_string(),
        })
    };

    let mut facts: Vec<PriceFact> = currency_amount_re()
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = clean_label(&format!(
                "{}{}{}",
                tail_chars(&content[..whole.start()], CONTEXT_CHARS),
                whole.as_str(),
                truncate_chars(&content[whole.end()..], CONTEXT_CHARS),
            ));
            fact(label, &caps)
        })
        .take(limits.price_pattern_cap)
        .collect();

    facts.extend(
        from_price_re()
            .captures_iter(content)
            .filter_map(|caps| {
                let label = clean_label(caps.get(0)?.as_str());
                fact(label, &caps)
            })
            .take(limits.from_price_pattern_cap),
    );

    facts
}

/// Run the extractor over a budgeted corpus.
pub fn extract_corpus(corpus: &Corpus, limits: &CrawlLimits, rules: &ContentRules) -> PricingSummary {
    let mut raw: Vec<PriceFact> = Vec::new();
    for page in &corpus.pages {
        if raw.len() >= limits.max_raw_price_facts {
            break;
        }
        raw.extend(extract_page(&page.content, &page.url, &page.title, limits, rules));
    }
    raw.truncate(limits.max_raw_price_facts);

    let mut facts = dedup_facts(raw);
    facts.truncate(limits.max_price_facts);
    let text = render_facts(&facts, limits.price_text_top);
    debug!(facts = facts.len(), "pricing extracted");

    PricingSummary { facts, text }
}

/// Drop facts whose `(label lowercased, amount, currency)` was already seen.
pub fn dedup_facts(facts: Vec<PriceFact>) -> Vec<PriceFact> {
    let mut seen = HashSet::new();
    facts
        .into_iter()
        .filter(|f| seen.insert(f.dedup_key()))
        .collect()
}

/// One line per fact, first `top` facts only.
pub fn render_facts(facts: &[PriceFact], top: usize) -> String {
    facts
        .iter()
        .take(top)
        .map(|f| format!("- {}: {} {} ({})", f.label, f.amount, f.currency, f.source_url))
        .collect::<Vec<_>>()
        .join("\n")
}

fn clean_label(text: &str) -> String {
    whitespace_re().replace_all(text, " ").trim().to_string()
}
fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
