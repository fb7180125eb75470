//! Configuration: crawl limits, content rule tables, and service endpoints.
//!
//! Service settings come from the environment:
//!
//! | Variable | Required | Meaning |
//! |---|---|---|
//! | `SITEDIGEST_CRAWLER_URL` | for remote digests | crawler service `/crawl` endpoint |
//! | `SITEDIGEST_CRAWLER_TOKEN` | for remote digests, optional when serving | shared secret |
//! | `SITEDIGEST_SUMMARIZER_KEY` | no | enables summarization |
//! | `SITEDIGEST_SUMMARIZER_URL` | no | chat completions endpoint |
//! | `SITEDIGEST_SUMMARIZER_MODEL` | no | model name sent to the summarizer |
//! | `SITEDIGEST_DB` | no | SQLite path for digests |

pub mod limits;
pub mod rules;

pub use limits::CrawlLimits;
pub use rules::{CategoryRule, ContentRules};

use crate::error::{DigestError, Result};
use std::path::PathBuf;

pub const DEFAULT_SUMMARIZER_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_SUMMARIZER_MODEL: &str = "gpt-4o-mini";

/// Where and how to reach the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizerConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

/// Endpoints and secrets, resolved once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub crawler_url: Option<String>,
    pub crawler_token: Option<String>,
    /// `None` disables summarization.
    pub summarizer: Option<SummarizerConfig>,
    pub db_path: PathBuf,
}

impl ServiceConfig {
    /// Read configuration from `SITEDIGEST_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let summarizer = get("SITEDIGEST_SUMMARIZER_KEY").map(|api_key| SummarizerConfig {
            api_key,
            endpoint: get("SITEDIGEST_SUMMARIZER_URL")
                .unwrap_or_else(|| DEFAULT_SUMMARIZER_URL.to_string()),
            model: get("SITEDIGEST_SUMMARIZER_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARIZER_MODEL.to_string()),
        });

        Self {
            crawler_url: get("SITEDIGEST_CRAWLER_URL"),
            crawler_token: get("SITEDIGEST_CRAWLER_TOKEN"),
            summarizer,
            db_path: get("SITEDIGEST_DB")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
        }
    }

    /// Crawler endpoint and token, both required to digest through the service.
    pub fn require_crawler(&self) -> Result<(&str, &str)> {
        let url = self.crawler_url.as_deref().ok_or_else(|| {
            DigestError::Configuration("SITEDIGEST_CRAWLER_URL is not set".to_string())
        })?;
        let token = self.crawler_token.as_deref().ok_or_else(|| {
            DigestError::Configuration("SITEDIGEST_CRAWLER_TOKEN is not set".to_string())
        })?;
        Ok((url, token))
    }
}

/// Default digest database at `~/.sitedigest/digest.db`.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".sitedigest")
        .join("digest.db")
}
