//! Static keyword and weight tables.
//!
//! The tables live in `content_rules.json`, embedded at compile time, so
//! categories and locales can grow without touching control flow.

use crate::error::{DigestError, Result};
use crate::model::Category;
use serde::Deserialize;
use std::sync::OnceLock;

const CONTENT_RULES_JSON: &str = include_str!("content_rules.json");

/// URL keywords and ranking weight for one category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
    pub label: Category,
    pub weight: f64,
    pub url_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentRules {
    /// Checked in order; the first group with a matching keyword wins.
    pub categories: Vec<CategoryRule>,
    pub general_weight: f64,
    /// Legal/privacy URL fragments. Matching pages never enter the corpus.
    pub excluded_url_patterns: Vec<String>,
    /// Lines containing any of these (case-insensitive) are boilerplate.
    pub boilerplate_lines: Vec<String>,
    /// Path/query fragments that make an internal link worth visiting.
    pub link_keywords: Vec<String>,
    /// Pages without any of these never reach the price regexes.
    pub price_indicators: Vec<String>,
    /// CSS selectors for disclosure widgets, clicked in this order.
    pub expandable_selectors: Vec<String>,
}

impl ContentRules {
    /// The embedded rule set, parsed once.
    pub fn builtin() -> &'static ContentRules {
        static RULES: OnceLock<ContentRules> = OnceLock::new();
        RULES.get_or_init(|| {
            Self::from_json(CONTENT_RULES_JSON).expect("embedded content rules are valid")
        })
    }

    /// Parse a rule set; keywords are lowercased so matchers only lowercase input.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut rules: ContentRules = serde_json::from_str(json)
            .map_err(|e| DigestError::Configuration(format!("invalid content rules: {e}")))?;
        for rule in &mut rules.categories {
            lowercase_all(&mut rule.url_keywords);
        }
        lowercase_all(&mut rules.excluded_url_patterns);
        lowercase_all(&mut rules.boilerplate_lines);
        lowercase_all(&mut rules.link_keywords);
        lowercase_all(&mut rules.price_indicators);
        Ok(rules)
    }

    /// Ranking weight of a category; unknown ones get the general weight.
    pub fn weight(&self, category: Category) -> f64 {
        self.categories
            .iter()
            .find(|r| r.label == category)
            .map(|r| r.weight)
            .unwrap_or(self.general_weight)
    }
}

fn lowercase_all(words: &mut [String]) {
    for w in words.iter_mut() {
        *w = w.to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_parse() {
        let rules = ContentRules::builtin();
        assert_eq!(rules.categories.len(), 10);
        assert!(!rules.expandable_selectors.is_empty());
        assert!(rules.price_indicators.iter().any(|k| k == "лв"));
    }

    #[test]
    fn test_weights_order_business_priority() {
        let rules = ContentRules::builtin();
        assert_eq!(rules.weight(Category::Pricing), 150.0);
        assert_eq!(rules.weight(Category::General), 10.0);
        assert_eq!(rules.weight(Category::Blog), 5.0);
        assert!(rules.weight(Category::Rooms) > rules.weight(Category::About));
        assert!(rules.weight(Category::Booking) > rules.weight(Category::Faq));
    }

    #[test]
    fn test_category_order_starts_with_pricing() {
        let labels: Vec<Category> = ContentRules::builtin()
            .categories
            .iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels[0], Category::Pricing);
        assert_eq!(labels[1], Category::Packages);
        assert_eq!(labels[9], Category::Blog);
    }

    #[test]
    fn test_from_json_lowercases_keywords() {
        let json = r#"{
            "categories": [{"label": "pricing", "weight": 1, "url_keywords": ["ЦЕНИ"]}],
            "general_weight": 1,
            "excluded_url_patterns": ["Privacy"],
            "boilerplate_lines": [],
            "link_keywords": [],
            "price_indicators": ["EUR"],
            "expandable_selectors": []
        }"#;
        let rules = ContentRules::from_json(json).unwrap();
        assert_eq!(rules.categories[0].url_keywords[0], "цени");
        assert_eq!(rules.excluded_url_patterns[0], "privacy");
        assert_eq!(rules.price_indicators[0], "eur");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = ContentRules::from_json("{").unwrap_err();
        assert_eq!(err.code(), "E_CONFIG");
    }
}
