//! Relevance ranking and corpus budgeting.
//!
//! Pages are categorized by URL, clamped, scored, stably sorted, and then
//! admitted until the page-count or character ceiling is hit.

use crate::config::{ContentRules, CrawlLimits};
use crate::crawl::links::keyword_haystack_str;
use crate::model::{Category, Corpus, NormalizedPage, RawPage};
use crate::text::{clean_text, truncate_chars};
use tracing::debug;

/// Cap on the length component of a page's score.
const MAX_LENGTH_BONUS: f64 = 35.0;

/// Characters per length point.
const CHARS_PER_POINT: f64 = 2000.0;

/// Whether a URL's path or query points at legal/privacy material that never enters the corpus.
pub fn is_excluded(url: &str, rules: &ContentRules) -> bool {
    let haystack = keyword_haystack_str(url);
    rules
        .excluded_url_patterns
        .iter()
        .any(|p| haystack.contains(p.as_str()))
}

/// First category group with a keyword in the URL path or query, else [`Category::General`].
pub fn categorize(url: &str, rules: &ContentRules) -> Category {
    let haystack = keyword_haystack_str(url);
    rules
        .categories
        .iter()
        .find(|rule| rule.url_keywords.iter().any(|k| haystack.contains(k.as_str())))
        .map(|rule| rule.label)
        .unwrap_or(Category::General)
}

/// `weight(category) + min(chars / 2000, 35)`.
pub fn score(page: &NormalizedPage, rules: &ContentRules) -> f64 {
    let length = page.content.chars().count() as f64 / CHARS_PER_POINT;
    rules.weight(page.category) + length.min(MAX_LENGTH_BONUS)
}

/// Clean and categorize raw pages. Excluded URLs are dropped here, and each
/// page's content is clamped to `max_page_chars`.
pub fn normalize_pages(
    pages: &[RawPage],
    limits: &CrawlLimits,
    rules: &ContentRules,
) -> Vec<NormalizedPage> {
    pages
        .iter()
        .filter(|p| {
            let excluded = is_excluded(&p.url, rules);
            if excluded {
                debug!(url = %p.url, "legal page excluded");
            }
            !excluded
        })
        .map(|p| {
            let cleaned = clean_text(&p.text, rules);
            NormalizedPage {
                url: p.url.clone(),
                title: p.title.clone(),
                content: truncate_chars(&cleaned, limits.max_page_chars)
                    .trim_end()
                    .to_string(),
                category: categorize(&p.url, rules),
            }
        })
        .collect()
}

/// Sort by descending score, keeping input order among equal scores.
pub fn sort_by_relevance(pages: Vec<NormalizedPage>, rules: &ContentRules) -> Vec<NormalizedPage> {
    let mut scored: Vec<(f64, NormalizedPage)> =
        pages.into_iter().map(|p| (score(&p, rules), p)).collect();
    // `sort_by` is stable.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, p)| p).collect()
}

/// Admit pages in order until a ceiling is reached.
///
/// The page that would cross the character ceiling is cut to the remaining
/// budget and kept only if it still clears `min_page_chars`.
pub fn budget(sorted: Vec<NormalizedPage>, limits: &CrawlLimits) -> Corpus {
    let mut corpus = Corpus::default();

    for mut page in sorted {
        if corpus.pages.len() >= limits.max_corpus_pages {
            break;
        }
        let remaining = limits.max_total_chars.saturating_sub(corpus.total_chars);
        if remaining == 0 {
            break;
        }

        let mut len = page.content.chars().count();
        if len < limits.min_page_chars {
            debug!(url = %page.url, chars = len, "page below length floor");
            continue;
        }
        if len > remaining {
            let cut = truncate_chars(&page.content, remaining).to_string();
            len = cut.chars().count();
            if len < limits.min_page_chars {
                debug!(url = %page.url, chars = len, "truncated page below floor, skipped");
                continue;
            }
            page.content = cut;
        }

        corpus.total_chars += len;
        corpus.pages.push(page);
    }

    corpus
}

/// Normalize, sort and budget a raw crawl.
pub fn build_corpus(pages: &[RawPage], limits: &CrawlLimits, rules: &ContentRules) -> Corpus {
    let normalized = normalize_pages(pages, limits, rules);
    let sorted = sort_by_relevance(normalized, rules);
    let corpus = budget(sorted, limits);
    debug!(
        pages = corpus.len(),
        chars = corpus.total_chars,
        "corpus budgeted"
    );
    corpus
}
