// Copyright 2026 SiteDigest Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end digest: crawl, normalize, rank, extract prices, summarize, persist.

use crate::config::{ContentRules, CrawlLimits};
use crate::crawl::PageSource;
use crate::error::{DigestError, Result};
use crate::pricing;
use crate::ranking::build_corpus;
use crate::store::{DigestRecord, DigestStatus, SessionStore};
use crate::summarizer::{self, Summarizer};
use crate::text::detect_language;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Wires a page source to the ranking, pricing and summarization stages.
pub struct DigestPipeline {
    source: Arc<dyn PageSource>,
    summarizer: Option<Arc<dyn Summarizer>>,
    store: Option<Arc<SessionStore>>,
    limits: CrawlLimits,
    rules: &'static ContentRules,
}

impl DigestPipeline {
    pub fn new(source: Arc<dyn PageSource>, limits: CrawlLimits) -> Self {
        Self {
            source,
            summarizer: None,
            store: None,
            limits,
            rules: ContentRules::builtin(),
        }
    }

    /// Without a summarizer the digest carries an empty summary.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_rules(mut self, rules: &'static ContentRules) -> Self {
        self.rules = rules;
        self
    }

    /// Digest `root_url` under `session_id`.
    ///
    /// On failure the session is marked failed in the store (when one is
    /// configured) and the original error is returned. A digest that cannot
    /// be saved fails with the persistence error.
    pub async fn run(&self, session_id: &str, root_url: &str, max_pages: usize) -> Result<DigestRecord> {
        let start = Instant::now();
        let mut result = self.execute(session_id, root_url, max_pages).await;

        if let Some(store) = &self.store {
            let saved = match &result {
                Ok(record) => store.save(record),
                Err(e) => {
                    if let Err(persist) = store.record_failure(session_id, e) {
                        error!(session = %session_id, error = %persist, "could not record failed digest");
                    }
                    Ok(())
                }
            };
            if let Err(e) = saved {
                result = Err(e);
            }
        }

        match &result {
            Ok(record) => info!(
                session = %session_id,
                pages = record.corpus.len(),
                chars = record.corpus.total_chars,
                prices = record.pricing_facts.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "digest completed"
            ),
            Err(e) => error!(session = %session_id, code = e.code(), error = %e, "digest failed"),
        }
        result
    }

    async fn execute(&self, session_id: &str, root_url: &str, max_pages: usize) -> Result<DigestRecord> {
        let raw = self.source.fetch_pages(root_url, max_pages).await?;
        let corpus = build_corpus(&raw, &self.limits, self.rules);

        if corpus.len() < self.limits.min_usable_pages {
            return Err(DigestError::CrawlTooSmall {
                pages: corpus.len(),
                required: self.limits.min_usable_pages,
            });
        }

        let prices = pricing::extract_corpus(&corpus, &self.limits, self.rules);

        let sample: String = corpus
            .pages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let language = detect_language(&sample);

        let summary = match &self.summarizer {
            Some(s) => {
                let input = summarizer::build_input(&corpus, &prices, &self.limits);
                summarizer::summarize_or_empty(s.as_ref(), &input, language).await
            }
            None => String::new(),
        };
        let company_name = summarizer::parse_company_name(&summary);

        Ok(DigestRecord {
            session_id: session_id.to_string(),
            status: DigestStatus::Completed,
            language: Some(language.to_string()),
            company_name,
            corpus,
            pricing_facts: prices.facts,
            pricing_text: prices.text,
            summary,
            error: None,
            updated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::SiteCrawler;
    use crate::renderer::fixture::{FixturePage, FixtureRenderer};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn limits() -> CrawlLimits {
        CrawlLimits {
            click_timeout_ms: 20,
            settle_delay_ms: 0,
            ..CrawlLimits::default()
        }
    }

    fn paragraph(seed: &str, n: usize) -> String {
        (0..n)
            .map(|i| format!("{seed} {i}: подробно описание на услугата и условията"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn hotel() -> FixtureRenderer {
        FixtureRenderer::builder()
            .page(
                "https://hotel.bg/",
                FixturePage::new("Хотел Панорама", &paragraph("Начало", 20)).with_links(&[
                    "https://hotel.bg/ceni",
                    "https://hotel.bg/za-nas",
                    "https://hotel.bg/gallery",
                ]),
            )
            .page(
                "https://hotel.bg/ceni",
                FixturePage::new("Цени", &paragraph("Сезон", 15))
                    .with_hidden(".accordion-header", "Нощувка от 45 лв\nЗакуска 12 лв. на човек"),
            )
            .page("https://hotel.bg/za-nas", FixturePage::new("За нас", &paragraph("История", 20)))
            .build()
    }

    struct ScriptedSummarizer {
        reply: Result<String>,
        inputs: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedSummarizer {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                inputs: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(DigestError::upstream("summarizer", "503")),
                inputs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Summarizer for ScriptedSummarizer {
        async fn summarize(&self, input: &str, language: &str) -> Result<String> {
            self.inputs
                .lock()
                .unwrap()
                .push((input.to_string(), language.to_string()));
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(DigestError::upstream("summarizer", e)),
            }
        }
    }

    #[tokio::test]
    async fn test_full_digest_is_ranked_priced_and_stored() {
        let renderer = hotel();
        let store = Arc::new(SessionStore::in_memory().unwrap());
        let summarizer = ScriptedSummarizer::replying("COMPANY_NAME: Хотел Панорама\nСемеен хотел.");
        let pipeline = DigestPipeline::new(
            Arc::new(SiteCrawler::new(Arc::new(renderer.clone()), limits())),
            limits(),
        )
        .with_summarizer(summarizer.clone())
        .with_store(store.clone());

        let record = pipeline.run("s1", "https://hotel.bg/", 10).await.unwrap();

        let urls: Vec<&str> = record.corpus.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://hotel.bg/ceni", "https://hotel.bg/za-nas", "https://hotel.bg/"]
        );
        assert!(record
            .pricing_facts
            .iter()
            .any(|f| f.amount == "45" && f.source_url == "https://hotel.bg/ceni"));
        assert_eq!(record.language.as_deref(), Some("bg"));
        assert_eq!(record.company_name.as_deref(), Some("Хотел Панорама"));

        let inputs = summarizer.inputs.lock().unwrap().clone();
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].0.starts_with("PRICING FACTS:\n"));
        assert_eq!(inputs[0].1, "bg");

        let stored = store.load("s1").unwrap().unwrap();
        assert_eq!(stored.status, DigestStatus::Completed);
        assert_eq!(stored.corpus.len(), 3);
        assert_eq!(renderer.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_single_page_site_is_too_small() {
        let renderer = FixtureRenderer::builder()
            .page("https://tiny.bg/", FixturePage::new("Tiny", &paragraph("Текст", 10)))
            .build();
        let store = Arc::new(SessionStore::in_memory().unwrap());
        let pipeline = DigestPipeline::new(
            Arc::new(SiteCrawler::new(Arc::new(renderer), limits())),
            limits(),
        )
        .with_store(store.clone());

        let err = pipeline.run("s2", "https://tiny.bg/", 10).await.unwrap_err();

        assert!(matches!(err, DigestError::CrawlTooSmall { pages: 1, required: 2 }));
        let stored = store.load("s2").unwrap().unwrap();
        assert_eq!(stored.status, DigestStatus::Failed);
    }

    #[tokio::test]
    async fn test_summarizer_failure_degrades_to_empty_summary() {
        let summarizer = ScriptedSummarizer::failing();
        let pipeline = DigestPipeline::new(
            Arc::new(SiteCrawler::new(Arc::new(hotel()), limits())),
            limits(),
        )
        .with_summarizer(summarizer);

        let record = pipeline.run("s3", "https://hotel.bg/", 10).await.unwrap();
        assert_eq!(record.summary, "");
        assert_eq!(record.company_name, None);
        assert_eq!(record.status, DigestStatus::Completed);
    }

    #[tokio::test]
    async fn test_without_summarizer_still_produces_corpus() {
        let pipeline = DigestPipeline::new(
            Arc::new(SiteCrawler::new(Arc::new(hotel()), limits())),
            limits(),
        );
        let record = pipeline.run("s4", "https://hotel.bg/", 10).await.unwrap();
        assert!(record.summary.is_empty());
        assert!(!record.pricing_text.is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.db");
        let store = Arc::new(SessionStore::open(&path).unwrap());
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE digests;")
            .unwrap();

        let pipeline = DigestPipeline::new(
            Arc::new(SiteCrawler::new(Arc::new(hotel()), limits())),
            limits(),
        )
        .with_store(store);

        let err = pipeline.run("s5", "https://hotel.bg/", 10).await.unwrap_err();
        assert_eq!(err.code(), "E_PERSISTENCE");
    }
}
