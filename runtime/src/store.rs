//! SQLite persistence of digest sessions.

use crate::error::{DigestError, Result};
use crate::model::{Corpus, PriceFact};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

/// Lifecycle state of a digest session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestStatus {
    Completed,
    Failed,
}

impl DigestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            _ => Self::Failed,
        }
    }
}

/// Everything persisted for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestRecord {
    pub session_id: String,
    pub status: DigestStatus,
    pub language: Option<String>,
    pub company_name: Option<String>,
    pub corpus: Corpus,
    pub pricing_facts: Vec<PriceFact>,
    pub pricing_text: String,
    pub summary: String,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl DigestRecord {
    /// An empty failed record carrying only the error message.
    pub fn failed(session_id: &str, error: &DigestError) -> Self {
        Self {
            session_id: session_id.to_string(),
            status: DigestStatus::Failed,
            language: None,
            company_name: None,
            corpus: Corpus::default(),
            pricing_facts: Vec::new(),
            pricing_text: String::new(),
            summary: String::new(),
            error: Some(error.to_string()),
            updated_at: Utc::now(),
        }
    }
}

/// Digest store backed by a single SQLite connection.
pub struct SessionStore {
    db: Mutex<Connection>,
}

impl SessionStore {
    /// Open or create the store, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DigestError::Persistence(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open a throwaway in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS digests (
                session_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                language TEXT,
                company_name TEXT,
                corpus_json TEXT NOT NULL,
                pricing_json TEXT NOT NULL,
                pricing_text TEXT NOT NULL,
                summary TEXT NOT NULL,
                error TEXT,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| DigestError::Persistence("store lock poisoned".to_string()))
    }

    /// Insert or replace the record for `record.session_id`.
    pub fn save(&self, record: &DigestRecord) -> Result<()> {
        let corpus = serde_json::to_string(&record.corpus)?;
        let pricing = serde_json::to_string(&record.pricing_facts)?;
        self.conn()?.execute(
            "INSERT INTO digests (session_id, status, language, company_name, corpus_json,
                                  pricing_json, pricing_text, summary, error, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(session_id) DO UPDATE SET
                status = excluded.status,
                language = excluded.language,
                company_name = excluded.company_name,
                corpus_json = excluded.corpus_json,
                pricing_json = excluded.pricing_json,
                pricing_text = excluded.pricing_text,
                summary = excluded.summary,
                error = excluded.error,
                updated_at = excluded.updated_at",
            rusqlite::params![
                record.session_id,
                record.status.as_str(),
                record.language,
                record.company_name,
                corpus,
                pricing,
                record.pricing_text,
                record.summary,
                record.error,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Mark a session failed without touching any previously stored content.
    pub fn record_failure(&self, session_id: &str, error: &DigestError) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let message = error.to_string();
        let db = self.conn()?;
        let updated = db.execute(
            "UPDATE digests SET status = ?2, error = ?3, updated_at = ?4 WHERE session_id = ?1",
            rusqlite::params![session_id, DigestStatus::Failed.as_str(), message, now],
        )?;
        if updated == 0 {
            drop(db);
            self.save(&DigestRecord::failed(session_id, error))?;
        }
        Ok(())
    }

    /// Load a session, `None` when it was never stored.
    pub fn load(&self, session_id: &str) -> Result<Option<DigestRecord>> {
        let db = self.conn()?;
        let row = db
            .query_row(
                "SELECT status, language, company_name, corpus_json, pricing_json,
                        pricing_text, summary, error, updated_at
                 FROM digests WHERE session_id = ?1",
                rusqlite::params![session_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, language, company_name, corpus, pricing, pricing_text, summary, error, updated_at)) =
            row
        else {
            return Ok(None);
        };

        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| DigestError::Persistence(format!("bad timestamp {updated_at}: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(DigestRecord {
            session_id: session_id.to_string(),
            status: DigestStatus::parse(&status),
            language,
            company_name,
            corpus: serde_json::from_str(&corpus)?,
            pricing_facts: serde_json::from_str(&pricing)?,
            pricing_text,
            summary,
            error,
            updated_at,
        }))
    }
}
