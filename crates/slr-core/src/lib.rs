use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod assistant;
pub mod backend;
pub mod client;
pub mod config_file;
pub mod curation;
pub mod mock;
pub mod relay;
pub mod scholar;
pub mod sidebar;
pub mod store;
pub mod toggle;

// Re-export for convenience
pub use backend::{Backend, BackendFuture};
pub use client::BackendClient;
pub use relay::{Relay, RuntimeMessage};
pub use store::{LocalStore, StoreError, StoreWatcher};

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Project that exists on every fresh backend.
pub const DEFAULT_PROJECT_ID: &str = "default";
/// Source label attached to scraped papers.
pub const GOOGLE_SCHOLAR: &str = "Google Scholar";

/// How long a [`Notice`] stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

fn default_source() -> String {
    GOOGLE_SCHOLAR.to_string()
}

fn default_project_id() -> String {
    DEFAULT_PROJECT_ID.to_string()
}

/// Review state of a collected paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Unread,
    Reviewed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Unread => "unread",
            ReviewStatus::Reviewed => "reviewed",
        }
    }

    /// The status a "Mark ..." toggle moves to.
    pub fn toggled(self) -> Self {
        match self {
            ReviewStatus::Unread => ReviewStatus::Reviewed,
            ReviewStatus::Reviewed => ReviewStatus::Unread,
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unread" => Ok(ReviewStatus::Unread),
            "reviewed" => Ok(ReviewStatus::Reviewed),
            other => Err(format!("unknown status '{}' (expected unread or reviewed)", other)),
        }
    }
}

/// A scraped bibliographic record plus curation metadata.
///
/// Field names on the wire match what the backend stores (`pdfUrl`,
/// `savedAt` and `abstract` are not snake_case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, rename = "pdfUrl")]
    pub pdf_url: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default = "default_project_id")]
    pub project_id: String,
    #[serde(default, rename = "savedAt", skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl Paper {
    /// Build a paper with only the identifying fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: String::new(),
            authors: String::new(),
            year: None,
            abstract_text: String::new(),
            pdf_url: None,
            source: default_source(),
            status: ReviewStatus::Unread,
            project_id: default_project_id(),
            saved_at: None,
        }
    }

    /// Same paper, filed under `project_id`.
    pub fn with_project(mut self, project_id: &str) -> Self {
        self.project_id = project_id.to_string();
        self
    }

    pub fn is_reviewed(&self) -> bool {
        self.status == ReviewStatus::Reviewed
    }

    /// Case-insensitive substring match on title or authors.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.authors.to_lowercase().contains(needle)
    }
}

/// A named collection grouping papers and query history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
        }
    }
}

/// A search string the user executed against the search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHistoryEntry {
    pub query: String,
    pub timestamp: String,
    #[serde(default)]
    pub project_id: String,
}

impl QueryHistoryEntry {
    /// Timestamp rendered in local time, or the raw value if it does not parse.
    pub fn display_time(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|_| self.timestamp.clone())
    }
}

/// A generated query suggestion. Never stored client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySuggestion {
    pub query: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `POST /extension/generate-queries`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateQueriesRequest {
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub strategy: String,
    #[serde(default)]
    pub sites: Vec<String>,
    pub api_key: String,
}

impl fmt::Debug for GenerateQueriesRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateQueriesRequest")
            .field("abstract_text", &self.abstract_text)
            .field("strategy", &self.strategy)
            .field("sites", &self.sites)
            .field("api_key", &"***")
            .finish()
    }
}

/// Response of `POST /extension/generate-queries`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateQueriesResponse {
    #[serde(default)]
    pub queries: Vec<QuerySuggestion>,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP request error: {0}")]
    Http(reqwest::Error),
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error(
        "backend returned HTTP {status}{}",
        detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default()
    )]
    Status { status: u16, detail: Option<String> },
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<reqwest::Error> for CoreError {
    /// Connection and timeout failures mean no response ever arrived.
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            CoreError::Unreachable(e.to_string())
        } else {
            CoreError::Http(e)
        }
    }
}

impl CoreError {
    /// The backend's `detail` message, if the failure carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            CoreError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// True when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::Http(_) | CoreError::Unreachable(_))
    }
}

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient user-facing message. A newer notice replaces an older one.
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    pub created: Instant,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            created: Instant::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    pub fn is_expired(&self) -> bool {
        self.created.elapsed() >= NOTICE_TTL
    }
}

/// Resolved client configuration.
#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    /// Per-request timeout. `None` leaves reqwest's default in place.
    pub timeout_secs: Option<u64>,
    pub api_key: Option<String>,
    pub strategy: String,
    pub sites: Vec<String>,
    /// Location of the local key-value store. `None` means the platform default.
    pub storage_path: Option<PathBuf>,
    pub theme: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("strategy", &self.strategy)
            .field("sites", &self.sites)
            .field("storage_path", &self.storage_path)
            .field("theme", &self.theme)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            api_key: None,
            strategy: assistant::DEFAULT_STRATEGY.to_string(),
            sites: vec![],
            storage_path: None,
            theme: "hacker".to_string(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Open the local store this config points at.
    pub fn open_store(&self) -> LocalStore {
        match self.storage_path.clone().or_else(store::default_path) {
            Some(path) => LocalStore::open(path),
            None => {
                tracing::warn!("no data directory available, using in-memory storage");
                LocalStore::in_memory()
            }
        }
    }
}
