//! Error taxonomy for the digest pipeline.
//!
//! Per-page and per-interaction failures are recovered where they happen;
//! everything that reaches a caller is one of these variants.

/// All errors surfaced by the digest pipeline and its collaborators.
#[derive(thiserror::Error, Debug)]
pub enum DigestError {
    /// Browser or navigation failure for a single page.
    #[error("render failed for {url}: {message}")]
    Render { url: String, message: String },

    /// A single expand/click attempt failed. Swallowed by the renderer.
    #[error("interaction with {selector} failed: {message}")]
    Interaction { selector: String, message: String },

    /// The root page could not be rendered, so there is nothing to crawl.
    #[error("crawl of {url} failed: {reason}")]
    Crawl { url: String, reason: String },

    #[error("only {pages} usable page(s) left after budgeting, at least {required} required")]
    CrawlTooSmall { pages: usize, required: usize },

    /// The crawler service or the summarizer answered with a non-success
    /// status or a payload we could not read.
    #[error("{service} error: {message}")]
    UpstreamService { service: String, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl DigestError {
    /// Stable machine-readable code used in REST error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Render { .. } => "E_RENDER",
            Self::Interaction { .. } => "E_INTERACTION",
            Self::Crawl { .. } => "E_CRAWL",
            Self::CrawlTooSmall { .. } => "E_TOO_SMALL",
            Self::UpstreamService { .. } => "E_UPSTREAM",
            Self::Configuration(_) => "E_CONFIG",
            Self::Unauthorized(_) => "E_UNAUTHORIZED",
            Self::Persistence(_) => "E_PERSISTENCE",
        }
    }

    pub(crate) fn render(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Render {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn upstream(service: &str, message: impl std::fmt::Display) -> Self {
        Self::UpstreamService {
            service: service.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<rusqlite::Error> for DigestError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for DigestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(format!("serialization failed: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_variant() {
        let errors = [
            DigestError::render("https://a.bg", "boom"),
            DigestError::Interaction {
                selector: "button".into(),
                message: "detached".into(),
            },
            DigestError::Crawl {
                url: "https://a.bg".into(),
                reason: "timeout".into(),
            },
            DigestError::CrawlTooSmall {
                pages: 1,
                required: 2,
            },
            DigestError::upstream("summarizer", "502"),
            DigestError::Configuration("missing".into()),
            DigestError::Unauthorized("bad token".into()),
            DigestError::Persistence("locked".into()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_too_small_message() {
        let e = DigestError::CrawlTooSmall {
            pages: 1,
            required: 2,
        };
        assert_eq!(
            e.to_string(),
            "only 1 usable page(s) left after budgeting, at least 2 required"
        );
    }
}
