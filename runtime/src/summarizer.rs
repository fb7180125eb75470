//! Summarizer collaborator: input assembly, HTTP client, response parsing.

use crate::config::{CrawlLimits, SummarizerConfig};
use crate::error::{DigestError, Result};
use crate::model::Corpus;
use crate::pricing::PricingSummary;
use crate::text::truncate_chars;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Separates page blocks in the summarizer input.
pub const PAGE_DELIMITER: &str = "\n\n=====\n\n";

const SERVICE: &str = "summarizer";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Build the single text blob handed to the summarizer.
///
/// Pricing facts come first, then the top ranked pages. The result is cut at
/// `summary_max_chars` regardless of where that falls.
pub fn build_input(corpus: &Corpus, pricing: &PricingSummary, limits: &CrawlLimits) -> String {
    let pages = corpus
        .pages
        .iter()
        .take(limits.summary_top_pages)
        .map(|p| {
            format!(
                "{}: {}\n{}\n{}",
                p.category.as_str().to_uppercase(),
                p.title,
                p.url,
                p.content
            )
        })
        .collect::<Vec<_>>()
        .join(PAGE_DELIMITER);

    let mut input = String::new();
    if !pricing.text.is_empty() {
        input.push_str("PRICING FACTS:\n");
        input.push_str(&pricing.text);
        input.push_str(PAGE_DELIMITER);
    }
    input.push_str(&pages);

    truncate_chars(&input, limits.summary_max_chars).to_string()
}

/// Company name from the first non-empty line, if it is `COMPANY_NAME: <value>`.
pub fn parse_company_name(summary: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^COMPANY_NAME:\s*(.+)$").expect("company name regex is valid")
    });

    let first = summary.lines().map(str::trim).find(|l| !l.is_empty())?;
    re.captures(first)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Anything that can turn a corpus blob into a business summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, input: &str, language: &str) -> Result<String>;
}

/// Run the summarizer, degrading to an empty summary on failure.
pub async fn summarize_or_empty(summarizer: &dyn Summarizer, input: &str, language: &str) -> String {
    match summarizer.summarize(input, language).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(code = e.code(), error = %e, "summarization failed, continuing without summary");
            String::new()
        }
    }
}

/// OpenAI-compatible chat completions client.
pub struct HttpSummarizer {
    client: reqwest::Client,
    config: SummarizerConfig,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl HttpSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DigestError::Configuration(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }
}

fn system_prompt(language: &str) -> String {
    let reply_in = if language == "bg" { "Bulgarian" } else { "English" };
    format!(
        "You summarize a company's website for a sales assistant. \
         The first line of your answer must be `COMPANY_NAME: <name>`. \
         Then describe what the business offers, its products or services, prices \
         (use the PRICING FACTS block when present), booking or ordering options and \
         contact details. Only state what the pages support. Answer in {reply_in}."
    )
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, input: &str, language: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": system_prompt(language) },
                { "role": "user", "content": input },
            ],
        });

        debug!(chars = input.chars().count(), model = %self.config.model, "requesting summary");

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DigestError::upstream(SERVICE, e))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(DigestError::upstream(
                SERVICE,
                format!("{status}: {}", truncate_chars(&detail, 200)),
            ));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| DigestError::upstream(SERVICE, format!("malformed response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| DigestError::upstream(SERVICE, "response has no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Currency, NormalizedPage, PriceFact};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(n: usize, category: Category, content: &str) -> NormalizedPage {
        NormalizedPage {
            url: format!("https://hotel.bg/p{n}"),
            title: format!("Page {n}"),
            content: content.to_string(),
            category,
        }
    }

    fn corpus(pages: Vec<NormalizedPage>) -> Corpus {
        let total_chars = pages.iter().map(|p| p.content.chars().count()).sum();
        Corpus { pages, total_chars }
    }

    fn pricing() -> PricingSummary {
        let facts = vec![PriceFact {
            label: "Нощувка от 45 лв".into(),
            amount: "45".into(),
            currency: Currency::Bgn,
            source_url: "https://hotel.bg/ceni".into(),
            source_title: "Цени".into(),
        }];
        let text = crate::pricing::render_facts(&facts, 80);
        PricingSummary { facts, text }
    }

    fn config(server: &MockServer) -> SummarizerConfig {
        SummarizerConfig {
            api_key: "sk-test".into(),
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            model: "test-model".into(),
        }
    }

    #[test]
    fn test_input_layout() {
        let c = corpus(vec![
            page(1, Category::Pricing, "prices here"),
            page(2, Category::About, "about us"),
        ]);
        let input = build_input(&c, &pricing(), &CrawlLimits::default());
        assert_eq!(
            input,
            "PRICING FACTS:\n- Нощувка от 45 лв: 45 BGN (https://hotel.bg/ceni)\n\n=====\n\n\
             PRICING: Page 1\nhttps://hotel.bg/p1\nprices here\n\n=====\n\n\
             ABOUT: Page 2\nhttps://hotel.bg/p2\nabout us"
        );
    }

    #[test]
    fn test_input_without_pricing_starts_with_first_page() {
        let c = corpus(vec![page(1, Category::General, "hello")]);
        let input = build_input(&c, &PricingSummary::default(), &CrawlLimits::default());
        assert!(input.starts_with("GENERAL: Page 1\n"));
    }

    #[test]
    fn test_input_respects_top_k_and_hard_clamp() {
        let limits = CrawlLimits {
            summary_top_pages: 2,
            summary_max_chars: 50,
            ..CrawlLimits::default()
        };
        let c = corpus((0..5).map(|i| page(i, Category::General, &"я".repeat(40))).collect());
        let input = build_input(&c, &PricingSummary::default(), &limits);
        assert_eq!(input.chars().count(), 50);

        let wide = CrawlLimits {
            summary_top_pages: 2,
            ..CrawlLimits::default()
        };
        let input = build_input(&c, &PricingSummary::default(), &wide);
        assert_eq!(input.matches(PAGE_DELIMITER).count(), 1);
        assert!(!input.contains("/p2"));
    }

    #[test]
    fn test_parse_company_name() {
        assert_eq!(
            parse_company_name("COMPANY_NAME: Хотел Панорама\nСемеен хотел..."),
            Some("Хотел Панорама".to_string())
        );
        assert_eq!(
            parse_company_name("\n\n  COMPANY_NAME:Acme Ltd  \nrest"),
            Some("Acme Ltd".to_string())
        );
        assert_eq!(parse_company_name("Summary first\nCOMPANY_NAME: Late"), None);
        assert_eq!(parse_company_name(""), None);
        assert_eq!(parse_company_name("COMPANY_NAME:   "), None);
    }

    #[tokio::test]
    async fn test_http_summarizer_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "COMPANY_NAME: Acme\nWe sell things." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = HttpSummarizer::new(config(&server)).unwrap();
        let summary = summarizer.summarize("input", "en").await.unwrap();
        assert_eq!(parse_company_name(&summary), Some("Acme".to_string()));
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let summarizer = HttpSummarizer::new(config(&server)).unwrap();
        let err = summarizer.summarize("input", "bg").await.unwrap_err();
        assert_eq!(err.code(), "E_UPSTREAM");
        assert_eq!(summarize_or_empty(&summarizer, "input", "bg").await, "");
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let summarizer = HttpSummarizer::new(config(&server)).unwrap();
        let err = summarizer.summarize("input", "en").await.unwrap_err();
        assert!(matches!(err, DigestError::UpstreamService { .. }));
    }
}
