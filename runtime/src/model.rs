//! Core data types flowing through the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A page as the renderer produced it. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPage {
    pub url: String,
    pub title: String,
    pub text: String,
}

/// Business category assigned to a page from its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Pricing,
    Packages,
    Rooms,
    Booking,
    Services,
    Products,
    Contact,
    Faq,
    About,
    Blog,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pricing => "pricing",
            Self::Packages => "packages",
            Self::Rooms => "rooms",
            Self::Booking => "booking",
            Self::Services => "services",
            Self::Products => "products",
            Self::Contact => "contact",
            Self::Faq => "faq",
            Self::About => "about",
            Self::Blog => "blog",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cleaned, categorized page ready for budgeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub category: Category,
}

/// Pages retained after ranking, in descending relevance order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub pages: Vec<NormalizedPage>,
    /// Sum of `content` lengths in characters.
    pub total_chars: usize,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Currency of an extracted price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "BGN")]
    Bgn,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bgn => "BGN",
            Self::Eur => "EUR",
        }
    }

    /// Map a matched currency token (`лв.`, `лева`, `€`, `eur`, ...) to a code.
    pub fn from_token(token: &str) -> Option<Self> {
        let t = token.trim().trim_end_matches('.').to_lowercase();
        match t.as_str() {
            "лв" | "лева" | "bgn" => Some(Self::Bgn),
            "евро" | "eur" | "euro" | "€" => Some(Self::Eur),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price mention pulled out of page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFact {
    pub label: String,
    /// Decimal amount with a comma as the fractional separator.
    pub amount: String,
    pub currency: Currency,
    pub source_url: String,
    pub source_title: String,
}

impl PriceFact {
    /// Key under which facts are deduplicated.
    pub fn dedup_key(&self) -> (String, String, Currency) {
        (self.label.to_lowercase(), self.amount.clone(), self.currency)
    }
}
