//! Link prioritizer: pick which internal pages are worth rendering.
//!
//! No scoring happens here. Order is first-seen order; the ranker decides
//! importance later.

use crate::config::ContentRules;
use percent_encoding::percent_decode_str;
use std::collections::HashSet;
use url::Url;

/// Same-origin links whose path or query carries a business keyword,
/// deduplicated by exact string and capped at `max`.
///
/// The root URL itself is never returned.
pub fn prioritize_links(
    root_url: &str,
    links: &[String],
    max: usize,
    rules: &ContentRules,
) -> Vec<String> {
    let Ok(root) = Url::parse(root_url) else {
        return Vec::new();
    };
    let origin = root.origin();

    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(root_url);
    let mut selected = Vec::new();

    for link in links {
        if selected.len() >= max {
            break;
        }
        let Ok(url) = Url::parse(link) else {
            continue;
        };
        if url.origin() != origin || !has_link_keyword(&url, rules) {
            continue;
        }
        if seen.insert(link.as_str()) {
            selected.push(link.clone());
        }
    }

    selected
}

fn has_link_keyword(url: &Url, rules: &ContentRules) -> bool {
    let haystack = keyword_haystack(url);
    rules
        .link_keywords
        .iter()
        .any(|k| haystack.contains(k.as_str()))
}

/// Percent-decoded, lowercased path plus `?query`. Scheme and host are left
/// out so a domain name never matches a keyword.
pub fn keyword_haystack(url: &Url) -> String {
    let mut haystack = percent_decode_str(url.path())
        .decode_utf8_lossy()
        .to_lowercase();
    if let Some(query) = url.query() {
        haystack.push('?');
        haystack.push_str(&percent_decode_str(query).decode_utf8_lossy().to_lowercase());
    }
    haystack
}

/// [`keyword_haystack`] for a URL string. Unparseable input is decoded and
/// lowercased as a whole.
pub fn keyword_haystack_str(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => keyword_haystack(&parsed),
        Err(_) => percent_decode_str(url).decode_utf8_lossy().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn prioritize(root: &str, list: &[&str], max: usize) -> Vec<String> {
        prioritize_links(root, &links(list), max, ContentRules::builtin())
    }

    #[test]
    fn test_keeps_same_origin_keyword_links_in_order() {
        let out = prioritize(
            "https://hotel.bg/",
            &[
                "https://hotel.bg/kontakti",
                "https://hotel.bg/gallery",
                "https://other.bg/ceni",
                "https://hotel.bg/ceni",
                "http://hotel.bg/uslugi",
                "https://hotel.bg/za-nas",
            ],
            10,
        );
        assert_eq!(
            out,
            vec![
                "https://hotel.bg/kontakti",
                "https://hotel.bg/ceni",
                "https://hotel.bg/za-nas",
            ]
        );
    }

    #[test]
    fn test_decodes_cyrillic_paths() {
        let out = prioritize(
            "https://hotel.bg/",
            &["https://hotel.bg/%D1%86%D0%B5%D0%BD%D0%B8"],
            10,
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_query_keywords_count() {
        let out = prioritize("https://hotel.bg/", &["https://hotel.bg/index.php?page=booking"], 10);
        assert_eq!(out, vec!["https://hotel.bg/index.php?page=booking"]);
    }

    #[test]
    fn test_dedup_exact_and_cap() {
        let out = prioritize(
            "https://hotel.bg/",
            &[
                "https://hotel.bg/ceni",
                "https://hotel.bg/ceni",
                "https://hotel.bg/ceni#top",
                "https://hotel.bg/menu",
                "https://hotel.bg/booking",
            ],
            3,
        );
        assert_eq!(
            out,
            vec![
                "https://hotel.bg/ceni",
                "https://hotel.bg/ceni#top",
                "https://hotel.bg/menu",
            ]
        );
    }

    #[test]
    fn test_unparseable_and_relative_links_dropped() {
        let out = prioritize(
            "https://hotel.bg/",
            &["/ceni", "mailto:info@hotel.bg", "javascript:void(0)", "not a url"],
            10,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_root_itself_is_skipped() {
        let out = prioritize("https://hotel.bg/za-nas", &["https://hotel.bg/za-nas"], 10);
        assert!(out.is_empty());
    }

    #[test]
    fn test_bad_root_yields_nothing() {
        assert!(prioritize("hotel.bg", &["https://hotel.bg/ceni"], 10).is_empty());
    }

    #[test]
    fn test_haystack_is_decoded_path_and_query_only() {
        assert_eq!(
            keyword_haystack_str("https://Legal-Hotel.bg/%D0%A6%D0%B5%D0%BD%D0%B8?Tab=Rooms"),
            "/цени?tab=rooms"
        );
        assert_eq!(keyword_haystack_str("not a url"), "not a url");
    }
}
